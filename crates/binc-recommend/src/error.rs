//! Error types for binc-recommend

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::BackendKind;

/// Result type alias for recommendation operations
pub type Result<T> = std::result::Result<T, RecommendError>;

/// Main error type for training and querying
#[derive(Error, Debug)]
pub enum RecommendError {
    /// Training batch contained no interactions
    #[error("Interaction batch is empty")]
    EmptyBatch,

    /// A record lacked a required field
    #[error("Interaction record {index} is missing field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// A record carried a NaN or infinite score
    #[error("Interaction record {index} has a non-finite score")]
    InvalidScore { index: usize },

    /// Query issued before any successful training
    #[error("Model not trained")]
    NotTrained,

    /// Query for a user absent from the last training batch
    #[error("User {0} not found in training data")]
    UnknownUser(i64),

    /// Backend not compiled into this build or missing a capability
    #[error("Backend {0} is not available")]
    BackendUnavailable(BackendKind),

    /// Numerical failure inside a backend
    #[error("Linear algebra failure in {backend} backend: {message}")]
    Linalg {
        backend: BackendKind,
        message: String,
    },

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Tabular input errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecommendError {
    pub(crate) fn linalg(backend: BackendKind, message: impl Into<String>) -> Self {
        RecommendError::Linalg {
            backend,
            message: message.into(),
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Config file could not be read
    #[error("Failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Dependency probe errors
///
/// These never escape `DependencyManager`; they are recorded in the
/// status report instead.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Fetch attempted without a usable fetcher
    #[error("No resource fetcher configured")]
    NoFetcher,

    /// Download failed
    #[error("Failed to fetch {resource}: {message}")]
    Fetch { resource: String, message: String },

    /// I/O error while writing a resource
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
