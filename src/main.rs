use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use trafficlog::{config::AppConfig, create_app, telemetry, AppState, DebugLogger};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    telemetry::init_tracing()?;

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    let logger = DebugLogger::from_settings(&config.debug_log)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, logger);
    let app = create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "trafficlog demo listening");

    axum::serve(listener, app).await?;

    Ok(())
}
