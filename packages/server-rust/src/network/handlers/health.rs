//! Health, liveness, and readiness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// Detailed health JSON, always 200.
///
/// The `state` field carries the actual condition so monitoring can tell
/// "up but draining" from "down"; `pending_calls` is the number of bus
/// requests currently awaiting their correlated reply.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.shutdown.health_state().as_str(),
        "in_flight": state.shutdown.in_flight_count(),
        "pending_calls": state.registry.len(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe: 200 whenever the process responds at all.
///
/// Deliberately ignores downstream health -- a failing liveness probe
/// restarts the pod, which no broker outage should cause.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 only in the `Ready` state, 503 while starting,
/// draining, or stopped, which removes the instance from load balancing.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{test_state, StaticRemote};
    use super::*;

    #[tokio::test]
    async fn health_reports_state_and_gauges() {
        let (state, _store) = test_state(StaticRemote::default());
        state.shutdown.set_ready();

        let body = health_handler(State(state)).await.0;
        assert_eq!(body["state"], "ready");
        assert_eq!(body["in_flight"], 0);
        assert_eq!(body["pending_calls"], 0);
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_counts_in_flight_requests() {
        let (state, _store) = test_state(StaticRemote::default());
        let _guard = state.shutdown.in_flight_guard();

        let body = health_handler(State(state)).await.0;
        assert_eq!(body["in_flight"], 1);
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_health_state() {
        let (state, _store) = test_state(StaticRemote::default());
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);

        state.shutdown.trigger_shutdown();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
