pub mod api;
pub mod config;
pub mod db;
pub mod identity;
pub mod intelligence;
pub mod models;
pub mod pipeline;
pub mod report;

#[cfg(test)]
mod phi_audit;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::db::{DatabaseError, Store};
use crate::pipeline::extraction::{ChatVisionClient, ExtractionError};
use crate::pipeline::processor::{ProcessingError, ProcessorConfig, ReportProcessor};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot open storage: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Cannot create extraction client: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Cannot create report processor: {0}")]
    Processor(#[from] ProcessingError),

    #[error("Async runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Open storage and build the processor.
///
/// Must run outside the async runtime: the blocking HTTP clients own
/// their own runtime.
pub fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    if config.uses_default_identity_salt() {
        tracing::warn!(
            "MEDREPORT_IDENTITY_SALT is not set; patient lookup digests use the public default salt"
        );
    }
    let store = Arc::new(Store::open(&config.db_path)?);

    let vision = ChatVisionClient::new(
        &config.vision_url,
        &config.vision_model,
        config.vision_api_key.clone(),
    )?;
    tracing::info!(
        url = %config.vision_url,
        model = %vision.model(),
        "Extraction client configured"
    );

    let processor = ReportProcessor::new(
        Box::new(vision),
        ProcessorConfig {
            identity_salt: config.identity_salt.clone(),
            history_window: config.history_window,
            extraction_timeout: config.extraction_timeout,
        },
    )?;

    Ok(ApiContext::new(
        store,
        Arc::new(processor),
        config.request_timeout,
    ))
}

/// Start the service and serve until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    init_tracing();
    tracing::info!("MedReport starting v{}", config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let ctx = build_context(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut server = api::start_server(ctx, config.bind_addr)
            .await
            .map_err(StartupError::Server)?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
        }
        server.shutdown();
        server.stopped().await;
        Ok(())
    })
}
