//! Error types for Notify.

use ddd_core::{ExceptionCode, Rank};
use ddd_transport::TransportError;
use thiserror::Error;

/// Errors that can occur during a Notify round.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Some rank raised an exception; every rank reports the same code.
    #[error("notify exception {0}")]
    Exception(ExceptionCode),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A phase packet could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// A resolved tuple names a destination with no route below this rank.
    #[error("no route from rank {at} to rank {dest}")]
    Unroutable { at: Rank, dest: Rank },
}

impl NotifyError {
    /// The exception code this error stands for when unwinding a phase.
    pub fn exception(&self) -> ExceptionCode {
        match self {
            NotifyError::Exception(code) => *code,
            NotifyError::Transport(TransportError::ChannelUnavailable { .. }) => {
                ExceptionCode::CHANNEL_UNAVAILABLE
            }
            _ => ExceptionCode::TRANSPORT,
        }
    }
}

/// Result type for Notify operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
