//! Common types and utilities shared across the crate.

// Submodule declarations
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};
