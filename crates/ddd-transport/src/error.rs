//! Error types for the transport layer.

use ddd_core::{Rank, Tag};
use thiserror::Error;

/// Errors that can occur inside a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer rank does not exist in this run.
    #[error("rank {rank} out of range for a run of {size} ranks")]
    RankOutOfRange { rank: Rank, size: usize },

    /// No point-to-point channel can be established to the peer.
    #[error("no channel from rank {from} to rank {to}")]
    ChannelUnavailable { from: Rank, to: Rank },

    /// Concentrate was attempted from the root of the tree.
    #[error("rank {0} is the tree root and has no parent")]
    NoParent(Rank),

    /// Spread or Concentrate named a rank that is not a child.
    #[error("rank {child} is not a child of rank {rank}")]
    NotAChild { rank: Rank, child: Rank },

    /// An arriving message does not have the length the receiver posted.
    #[error("message from rank {src} tag {tag:?}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        src: Rank,
        tag: Tag,
        expected: usize,
        actual: usize,
    },

    /// A collective payload could not be decoded.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
