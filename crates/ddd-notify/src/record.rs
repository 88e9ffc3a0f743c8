//! Notify records and the packets that carry them between waves.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use ddd_core::{ExceptionCode, Rank};

use crate::error::{NotifyError, Result};

/// How far a record has travelled towards its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    /// Addressed to the rank currently holding it.
    SelfOnly,
    /// Destination lies below one of this rank's children.
    ResolvedLocally,
    /// Marks the existence of its source rank; has no destination.
    Placeholder,
    /// Destination is outside this rank's subtree.
    Unresolved,
}

/// One announced message, or a placeholder for a rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRecord {
    /// Sending rank.
    pub from: Rank,
    /// Receiving rank; `None` for placeholders.
    pub to: Option<Rank>,
    /// Position in the sender's announcement list.
    pub index: u32,
    /// Message size in bytes.
    pub size: u64,
    pub class: Classification,
}

impl NotifyRecord {
    /// An announced message, not yet resolved.
    pub fn message(from: Rank, to: Rank, index: u32, size: u64) -> Self {
        Self {
            from,
            to: Some(to),
            index,
            size,
            class: Classification::Unresolved,
        }
    }

    /// The placeholder standing for `rank`.
    pub fn placeholder(rank: Rank) -> Self {
        Self {
            from: rank,
            to: None,
            index: 0,
            size: 0,
            class: Classification::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.class == Classification::Placeholder
    }
}

/// What one rank hands to its parent (wave 1) or to a child (wave 2).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub exception: Option<ExceptionCode>,
    pub records: Vec<NotifyRecord>,
}

impl Packet {
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| NotifyError::Codec(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| NotifyError::Codec(e.to_string()))
    }
}
