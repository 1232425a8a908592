//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::MAX_IMAGE_BYTES;

/// Request body limit: a maximal image in base64 plus JSON overhead.
pub const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES / 3 * 4 + 64 * 1024;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/reports", post(endpoints::reports::create))
        .route("/reports/:report_id", get(endpoints::reports::detail))
        .route(
            "/patients",
            get(endpoints::patients::lookup).put(endpoints::patients::upsert),
        )
        .route(
            "/patients/:patient_id/reports",
            get(endpoints::reports::list_for_patient),
        )
        .route(
            "/patients/:patient_id/summary",
            get(endpoints::reports::summary),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
