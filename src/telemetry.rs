use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,trafficlog=debug";

/// Installs the global subscriber. `LOG_FORMAT=json` switches to JSON lines;
/// `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub fn init_tracing() -> Result<()> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(filter);

    match log_format.as_str() {
        "json" => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        _ => subscriber.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    Ok(())
}
