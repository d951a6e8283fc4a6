//! Error type for ROOT file reading.

use thiserror::Error;

/// Failure while opening or decoding a ROOT file.
#[derive(Error, Debug)]
pub enum RootError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the `root` magic
    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    /// A read ran past the end of the available bytes
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Read position
        offset: usize,
        /// Bytes requested
        need: usize,
        /// Bytes available
        have: usize,
    },

    /// A compressed block could not be inflated
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Streamed object layout did not match expectations
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// No key with this name or path
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Object class cannot be read as a histogram
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),
}

/// Result alias for ROOT reading.
pub type Result<T> = std::result::Result<T, RootError>;
