//! Error types for getweights

use thiserror::Error;

/// getweights error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Sample name does not follow the dataset naming convention
    #[error("unparsable sample name '{name}': {reason}")]
    UnparsableName {
        /// The offending name
        name: String,
        /// Which part could not be extracted
        reason: String,
    },

    /// An event counter could not produce a count for a file
    #[error("cannot count events in {path}: {message}")]
    Counter {
        /// File that was being read
        path: String,
        /// Underlying failure
        message: String,
    },

    /// A file read did not finish within the configured timeout
    #[error("reading {path} timed out after {seconds:.1}s")]
    Timeout {
        /// File that was being read
        path: String,
        /// Timeout that elapsed
        seconds: f64,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Environment or setup problem detected before any work starts
    #[error("setup error: {0}")]
    Setup(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
