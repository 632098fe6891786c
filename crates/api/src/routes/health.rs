use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the storage backend is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub storage: StorageHealth,
}

#[derive(Serialize)]
pub struct StorageHealth {
    /// `postgres` or `memory`.
    pub backend: &'static str,
    pub reachable: bool,
}

/// GET /health -- 200 while storage answers, 503 otherwise.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.repos.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.repos.backend(), "Storage health check failed");
            false
        }
    };

    let (code, status) = if reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage: StorageHealth {
            backend: state.repos.backend(),
            reachable,
        },
    };
    (code, Json(body))
}

/// Mounted at the root, outside `/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
