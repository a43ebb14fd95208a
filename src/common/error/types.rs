//! Unified error types for the rambutan library.
use thiserror::Error;

/// Main error type for rambutan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Caller-supplied input failed validation before any work began
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Settings file could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single document in a batch failed; siblings are unaffected
    #[error("Document {index}: {message}")]
    Document { index: usize, message: String },
}

/// Result type for rambutan operations.
pub type Result<T> = std::result::Result<T, Error>;
