//! Health and source-status handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// One source's health as reported by the supervisor.
#[derive(Serialize)]
pub struct SourceStatusResponse {
    pub name: String,
    pub healthy: bool,
    pub initialized: bool,
    pub success_count: u64,
    pub error_count: u64,
    pub last_check: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    pub circuit_state: String,
}

/// Current health map over every configured source.
pub async fn sources_status(State(state): State<AppState>) -> Json<Vec<SourceStatusResponse>> {
    let mut statuses: Vec<SourceStatusResponse> = state
        .service
        .manager()
        .health()
        .all_statuses()
        .into_iter()
        .map(|status| SourceStatusResponse {
            name: status.name,
            healthy: status.healthy,
            initialized: status.initialized,
            success_count: status.success_count,
            error_count: status.error_count,
            last_check: status.last_check.to_rfc3339(),
            last_error: status.last_error,
            response_time_ms: status.response_time.map(|d| d.as_millis() as u64),
            circuit_state: status.circuit_state,
        })
        .collect();

    statuses.sort_by(|a, b| a.name.cmp(&b.name));
    Json(statuses)
}
