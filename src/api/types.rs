use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::Store;
use crate::pipeline::processor::ReportProcessor;

use super::error::ApiError;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<Store>,
    pub processor: Arc<ReportProcessor>,
    /// Budget for one `POST /api/reports`, measured from request arrival.
    pub request_timeout: Duration,
}

impl ApiContext {
    pub fn new(store: Arc<Store>, processor: Arc<ReportProcessor>, request_timeout: Duration) -> Self {
        Self {
            store,
            processor,
            request_timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        Instant::now() + self.request_timeout
    }

    pub fn identity_salt(&self) -> &str {
        &self.processor.config().identity_salt
    }
}

/// Run storage or pipeline work off the async executor.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
