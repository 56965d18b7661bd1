//! System endpoints: health check and relay statistics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::domain::Expiring;
use crate::service::StatsSnapshot;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// Store sizes plus pipeline counters.
#[derive(Debug, Serialize)]
struct StatsResponse {
    uptime_secs: i64,
    dedup_entries: usize,
    milestone_entries: usize,
    #[serde(flatten)]
    counters: StatsSnapshot,
}

/// `GET /health`: service health status.
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /stats`: store sizes and relay counters.
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let relay = &state.relay;
    (
        StatusCode::OK,
        Json(StatsResponse {
            uptime_secs: Utc::now()
                .signed_duration_since(state.started_at)
                .num_seconds(),
            dedup_entries: relay.dedup().len(),
            milestone_entries: relay.milestones().len(),
            counters: relay.stats(),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;
    use crate::service::relay_service::tests::{RecordingNotifier, make_service};

    async fn body_json(response: axum::response::Response) -> Value {
        let Ok(bytes) = to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("body should be readable");
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn stats_flattens_counters() {
        let relay = Arc::new(make_service(Arc::new(RecordingNotifier::default())));
        let _ = relay.handle_order_body("garbage").await;
        let state = AppState::new(relay);

        let response = stats_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["poison_messages"], 1);
        assert_eq!(json["queue_messages"], 1);
        assert_eq!(json["dedup_entries"], 0);
    }
}
