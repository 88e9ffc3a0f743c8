//! Error types for DDD core.

use thiserror::Error;

/// Errors raised when constructing core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("exception codes must be negative, got {0}")]
    NotAnException(i32),
}
