//! Error types for the DDD context.

use ddd_cons::ConsError;
use ddd_core::{CoreError, ExceptionCode};
use ddd_lowcomm::LowCommError;
use ddd_notify::NotifyError;
use ddd_transport::TransportError;
use thiserror::Error;

/// Errors that can occur during DDD operations.
#[derive(Debug, Error)]
pub enum DddError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    #[error("lowcomm error: {0}")]
    LowComm(#[from] LowCommError),

    #[error("consistency check error: {0}")]
    Cons(#[from] ConsError),
}

impl DddError {
    /// The exception code to withdraw from a phase with, if the error came
    /// out of one.
    pub fn exception(&self) -> Option<ExceptionCode> {
        match self {
            DddError::Core(_) => None,
            DddError::Transport(TransportError::ChannelUnavailable { .. }) => {
                Some(ExceptionCode::CHANNEL_UNAVAILABLE)
            }
            DddError::Transport(_) => Some(ExceptionCode::TRANSPORT),
            DddError::Notify(e) => Some(e.exception()),
            DddError::LowComm(e) => Some(e.exception()),
            DddError::Cons(ConsError::LowComm(e)) => Some(e.exception()),
            DddError::Cons(ConsError::Transport(_)) => Some(ExceptionCode::TRANSPORT),
        }
    }
}

/// Result type for DDD operations.
pub type Result<T> = std::result::Result<T, DddError>;
