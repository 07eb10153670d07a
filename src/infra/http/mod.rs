//! HTTP transport for the request router.

mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::router::RequestRouter;

pub use handlers::status_for;

#[derive(Clone)]
pub struct HttpState {
    pub router: Arc<RequestRouter>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/v1/compile", post(handlers::compile))
        .route("/v1/render", post(handlers::render))
        .route("/v1/flush", post(handlers::flush))
        .route("/v1/bus", post(handlers::bus))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
