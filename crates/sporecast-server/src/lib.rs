//! Sporecast Server - Prediction API Server
//!
//! HTTP server exposing the classifier at `POST /predict`.

pub mod http;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sporecast_core::{
    Classifier, ConfigError, ModelError, SporecastConfig, DEFAULT_MAX_BODY_BYTES,
};

/// Startup and serving failures
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state
pub struct AppState {
    pub classifier: Classifier,
    /// Log raw request bodies at debug level
    pub log_payloads: bool,
    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            log_payloads: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Load the model and code table named by the config
    pub fn from_config(config: &SporecastConfig) -> Result<Self, ServerError> {
        let classifier = Classifier::from_config(config)?;
        Ok(Self {
            classifier,
            log_payloads: config.log_payloads,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/predict", post(http::predict))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Start the server and run until Ctrl-C
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<(), ServerError> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Sporecast server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
