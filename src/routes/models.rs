//! Model routes under `/models`. Handlers resolve the model by slug.

use super::common::common_routes_with_ready;
use crate::handlers::model::{create, delete as delete_handler, form, index, list, read, update};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn model_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/models", get(index))
        .route("/models/:slug", get(list).post(create))
        .route(
            "/models/:slug/:id",
            get(read).post(update).delete(delete_handler),
        )
        .route("/models/:slug/:id/form", get(form))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

/// Model routes plus health, readiness and version.
pub fn admin_router(state: AppState, body_limit: usize) -> Router {
    common_routes_with_ready(state.clone()).merge(model_routes(state, body_limit))
}
