//! Sporecast Core - Mushroom edibility classification from feature records
//!
//! This crate provides everything between a JSON payload and class labels:
//!
//! - **Frame**: record- or column-oriented JSON to a named-column table
//! - **Schema**: the 20 model features and which of them are categorical
//! - **Encoder**: placeholder filling, category codes, numeric coercion
//! - **Booster**: XGBoost JSON model loading and tree ensemble scoring
//! - **Predictor**: scores to 0/1 labels behind the [`Scorer`] trait
//! - **Classifier**: the whole pipeline, built once from [`SporecastConfig`]
//! - **Config**: service configuration
//!
//! # Pipeline
//!
//! ```text
//! JSON ─► Frame ─► FeatureEncoder ─► NumericMatrix ─► Scorer ─► round ─► labels
//! ```

pub mod booster;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod predictor;
pub mod schema;

pub use booster::{Objective, XgbBooster};
pub use classifier::Classifier;
pub use config::{SporecastConfig, DEFAULT_CONFIG_FILE, DEFAULT_MAX_BODY_BYTES};
pub use encoder::{CategoryEncoding, CodeTable, FeatureEncoder, NumericMatrix, UNKNOWN_CODE};
pub use error::{
    ConfigError, EncodingError, ModelError, PredictionError, Result, SporecastError,
};
pub use frame::{Column, Frame, RawValue};
pub use predictor::{Predictor, Scorer};
pub use schema::{FeatureSchema, CATEGORICAL_FEATURES, MISSING_TOKEN, MUSHROOM_FEATURES};

/// Returns the version of sporecast-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
