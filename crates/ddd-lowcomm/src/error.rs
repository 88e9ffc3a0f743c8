//! Error types for LowComm.
//!
//! Only runtime conditions are errors. Misuse of the API (calls in the wrong
//! state, component limit, registry overflow, stale handles) panics.

use ddd_core::{ExceptionCode, Rank};
use ddd_notify::NotifyError;
use ddd_transport::TransportError;
use thiserror::Error;

/// A received buffer that does not describe a valid message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("buffer of {0} bytes is shorter than its header")]
    Truncated(usize),

    #[error("bad magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("component count mismatch: expected {expected}, found {found}")]
    ComponentCount { expected: usize, found: usize },

    #[error("component {index} lies outside the {len}-byte buffer")]
    OutOfBounds { index: usize, len: usize },

    #[error("component {index}: {size} bytes is not {entries} entries of {entry_size} bytes")]
    EntryMismatch {
        index: usize,
        size: usize,
        entries: usize,
        entry_size: usize,
    },
}

/// Errors that can occur during LowComm operations.
#[derive(Debug, Error)]
pub enum LowCommError {
    /// A collective phase failed; every rank observes the same code.
    #[error("lowcomm exception {0}")]
    Exception(ExceptionCode),

    /// A send buffer could not be allocated, even after reclaiming.
    #[error("no memory left to reclaim: {needed} bytes requested")]
    OutOfMemory { needed: usize },

    /// The shared receive buffer of a phase could not be allocated.
    #[error("cannot allocate {needed}-byte receive buffer")]
    RecvBufferExhausted { needed: usize },

    /// This rank failed to set up its part of a phase and withdrew; the other
    /// ranks observe `Exception(code)`.
    #[error("withdrew from phase with exception {code}: {source}")]
    Withdrawn {
        code: ExceptionCode,
        #[source]
        source: Box<LowCommError>,
    },

    /// A received message violates the wire format.
    #[error("protocol violation in message from rank {src}: {source}")]
    Protocol {
        src: Rank,
        #[source]
        source: LayoutError,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Notify failed for a reason other than an exception.
    #[error("notify error: {0}")]
    Notify(NotifyError),
}

impl From<NotifyError> for LowCommError {
    fn from(e: NotifyError) -> Self {
        match e {
            NotifyError::Exception(code) => LowCommError::Exception(code),
            other => LowCommError::Notify(other),
        }
    }
}

impl LowCommError {
    /// The exception code to withdraw from a phase with.
    pub fn exception(&self) -> ExceptionCode {
        match self {
            LowCommError::Exception(code) | LowCommError::Withdrawn { code, .. } => *code,
            LowCommError::OutOfMemory { .. } | LowCommError::RecvBufferExhausted { .. } => {
                ExceptionCode::OUT_OF_MEMORY
            }
            LowCommError::Transport(TransportError::ChannelUnavailable { .. }) => {
                ExceptionCode::CHANNEL_UNAVAILABLE
            }
            LowCommError::Notify(e) => e.exception(),
            LowCommError::Protocol { .. } | LowCommError::Transport(_) => {
                ExceptionCode::TRANSPORT
            }
        }
    }
}

/// Result type for LowComm operations.
pub type Result<T> = std::result::Result<T, LowCommError>;
