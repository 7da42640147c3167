//! Sporecast Server Binary
//!
//! Loads `sporecast.toml` from the working directory (defaults otherwise),
//! loads the model, and serves `POST /predict`.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use sporecast_core::{SporecastConfig, DEFAULT_CONFIG_FILE};
use sporecast_server::{serve, AppState, ServerError};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = SporecastConfig::load_or_default(DEFAULT_CONFIG_FILE)?;
    let addr = config.socket_addr()?;

    // No model, no service
    let state = Arc::new(AppState::from_config(&config)?);

    serve(addr, state).await
}
