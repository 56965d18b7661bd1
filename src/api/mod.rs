//! Status API: health and statistics endpoints.

pub mod handlers;

use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the status router with tracing and a request timeout.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::system::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(10))),
        )
        .with_state(state)
}
