//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext};
use crate::db::DatabaseError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus a storage round-trip.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let store = ctx.store.clone();
    let database = run_blocking(move || {
        Ok(store
            .with_conn(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(DatabaseError::from)
            })
            .is_ok())
    })
    .await?;

    Ok(Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        version: crate::config::APP_VERSION,
    }))
}
