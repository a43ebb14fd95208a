//! Unified error types for the rambutan library.
//!
//! This module provides a single error type covering document-part parsing,
//! substitution, merging, and batch generation, presenting a consistent API
//! to users.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
