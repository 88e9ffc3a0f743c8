//! Error types for the consistency checker.
//!
//! Inconsistencies are findings, not errors. These are the failures that keep
//! the check itself from completing.

use ddd_lowcomm::LowCommError;
use ddd_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsError {
    #[error("lowcomm error: {0}")]
    LowComm(#[from] LowCommError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for consistency-check operations.
pub type Result<T> = std::result::Result<T, ConsError>;
