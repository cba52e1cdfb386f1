use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod body;
pub mod channel;
pub mod config;
pub mod error;
pub mod filters;
pub mod formatter;
pub mod headers;
pub mod message;
pub mod middleware;
pub mod record;
pub mod routes;
pub mod setup;
pub mod telemetry;
pub mod templates;

pub use channel::{Channel, Handler, MemoryHandler, StreamHandler, TracingHandler};
pub use error::{Error, Result};
pub use formatter::{Formatter, FormatterOptions};
pub use message::{CapturedRequest, CapturedResponse, LogRecord, Message};
pub use middleware::debug_requests_responses;
pub use setup::DebugLogger;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub logger: Arc<DebugLogger>,
}

impl AppState {
    pub fn new(config: config::AppConfig, logger: DebugLogger) -> Self {
        Self {
            config: Arc::new(config),
            logger: Arc::new(logger),
        }
    }
}

/// The demo application: sample routes wrapped in the debug-logging
/// middleware and, unless disabled, tower-http's access log.
pub fn create_app(state: AppState) -> Router {
    let app = Router::new()
        .route("/", get(routes::demo::index))
        .route("/unauthorized", get(routes::demo::unauthorized))
        .route("/xml", get(routes::demo::ugly_xml))
        .route("/notes", post(routes::demo::create_note))
        .route("/stream", get(routes::demo::stream))
        .route("/health", get(routes::health::health));

    let app = if state.config.debug_log.disable_downstream_access_log {
        app
    } else {
        app.layer(TraceLayer::new_for_http())
    };

    app.layer(axum::middleware::from_fn_with_state(
        state.logger.clone(),
        debug_requests_responses,
    ))
    .with_state(state)
}
