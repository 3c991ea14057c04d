use std::sync::Arc;

use axum::{Extension, Router, routing::get};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full application router with env-selected service wiring.
pub async fn build_app() -> Router {
    let services = Arc::new(build_services().await);
    build_app_with(services)
}

/// Build the router around existing services (tests inject in-memory wiring).
pub fn build_app_with(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::router())
        .layer(Extension(services))
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
