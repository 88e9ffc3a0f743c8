//! Strong type definitions for DDD.
//!
//! All identifiers are newtypes to prevent mixing ranks, ids and priorities
//! at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant in the parallel run, numbered `0..size`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// Create a rank from its number.
    pub const fn new(rank: u32) -> Self {
        Self(rank)
    }

    /// The rank as a vector index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all ranks of a run of `size` ranks.
    pub fn all(size: usize) -> impl Iterator<Item = Rank> {
        (0..size as u32).map(Rank)
    }
}

impl fmt::Debug for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.0)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(rank: u32) -> Self {
        Self(rank)
    }
}

/// Global object id.
///
/// Unique across all ranks. The total order on ids is what the consistency
/// checker merge-joins on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gid(pub u64);

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gid({:#010x})", self.0)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Priority of one replica of a distributed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub u8);

impl Priority {
    /// Priority of a master copy.
    pub const MASTER: Self = Self(0);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered object type of a distributed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjType(pub u16);

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-to-point matching tag.
///
/// Messages between one pair of ranks are matched on their tag, so two
/// messages in flight between the same pair never get confused. The high
/// half holds the phase a message belongs to, so a message left over from an
/// aborted phase never matches a receive of a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag(pub u64);

impl Tag {
    /// Tag of the `seq`-th message between one pair of ranks in `phase`.
    pub const fn phased(phase: u32, seq: u32) -> Self {
        Self(((phase as u64) << 32) | seq as u64)
    }

    pub const fn phase(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn seq(self) -> u32 {
        self.0 as u32
    }
}
