//! Route table.

use crate::api::handlers;
use crate::api::ApiContext;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

/// Page images at scale 2 run to several MB of base64.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the proxy router with all routes under `/api/`.
pub fn router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/extract-questions", post(handlers::extract_questions))
        .route("/api/models", get(handlers::list_models))
        .route("/api/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(ctx)
}
