use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub logging: LoggingStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingStatus {
    pub requests: bool,
    pub responses: bool,
    pub pretty_print: bool,
    pub level: String,
}

/// Basic health check endpoint
///
/// Reports the service as running together with the active debug-log settings.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("Health check requested");

    let settings = &state.config.debug_log;
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        logging: LoggingStatus {
            requests: settings.enable_requests,
            responses: settings.enable_responses,
            pretty_print: settings.pretty_print,
            level: settings.level.clone(),
        },
    })
}
