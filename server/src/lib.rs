//! Datamock HTTP server
//!
//! Serves paginated synthetic datasets from `datamock-core` and injects
//! latency and errors into record requests according to a runtime-mutable
//! fault configuration.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{CliOverrides, ServerConfig};
pub use error::ApiError;
pub use state::AppState;

/// Build the complete application router
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/status", get(api::status))
        .with_state(state.clone())
        .nest("/api", api::create_router(state))
        .fallback(api::not_found)
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
