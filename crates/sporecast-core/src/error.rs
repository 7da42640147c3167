//! Error types for sporecast-core

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sporecast operations
pub type Result<T> = std::result::Result<T, SporecastError>;

/// Main error type for sporecast operations
#[derive(Error, Debug)]
pub enum SporecastError {
    /// Request payload could not be turned into a feature matrix
    #[error("{0}")]
    Encoding(#[from] EncodingError),

    /// Scoring the feature matrix failed
    #[error("{0}")]
    Prediction(#[from] PredictionError),

    /// Model artifact could not be loaded
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl SporecastError {
    /// Whether the error was caused by the request rather than the process
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SporecastError::Encoding(_) | SporecastError::Prediction(_)
        )
    }
}

/// Malformed or incompatible request payloads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// Body is not JSON
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    /// Payload is neither an array of records nor an object of columns
    #[error("Payload must be an array of records or an object of columns, got {0}")]
    NotTabular(&'static str),

    /// An element of a record array is not an object
    #[error("Record {index} is not an object (got {kind})")]
    NonObjectRecord { index: usize, kind: &'static str },

    /// A cell holds an array or object
    #[error("Nested value in column '{column}'")]
    NestedValue { column: String },

    /// Column arrays differ in length
    #[error("All columns must be the same length: '{column}' has {actual}, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Some columns are arrays and others are keyed objects
    #[error("Cannot mix array columns with keyed object columns")]
    MixedColumnLayouts,

    /// Column-oriented object without any array to size the table
    #[error("If using all scalar values, at least one column must be an array")]
    ScalarColumnsOnly,
}

impl From<serde_json::Error> for EncodingError {
    fn from(err: serde_json::Error) -> Self {
        EncodingError::InvalidJson(err.to_string())
    }
}

/// Failures of the scoring step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Nothing to score
    #[error("Cannot predict on an empty batch")]
    EmptyBatch,

    /// Matrix width does not match the model
    #[error("Feature shape mismatch: model expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Scorer produced something that is not a probability
    #[error("Score {score} for row {row} is not a probability")]
    ScoreOutOfRange { row: usize, score: f32 },
}

/// Model and code-table loading errors
#[derive(Error, Debug)]
pub enum ModelError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid model JSON
    #[error("Failed to parse model JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Objective the scorer does not know how to transform
    #[error("Unsupported objective: {0}")]
    UnsupportedObjective(String),

    /// Booster other than gbtree
    #[error("Unsupported booster: {0}")]
    UnsupportedBooster(String),

    /// Multi-class models produce more than one score per row
    #[error("Multi-class models are not supported (num_class = {0})")]
    MultiClass(usize),

    /// Categorical splits need category sets the scorer does not read
    #[error("Tree {tree} uses categorical splits, which are not supported")]
    CategoricalSplit { tree: usize },

    /// Tree arrays are inconsistent
    #[error("Malformed tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },

    /// Model parameter could not be parsed
    #[error("Invalid model parameter '{name}': {value}")]
    InvalidParam { name: &'static str, value: String },

    /// Feature names and feature count disagree
    #[error("Model expects {expected} features but the schema has {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or type error
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or type error
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Value out of range
    #[error("Invalid value: {0}")]
    Invalid(String),
}
