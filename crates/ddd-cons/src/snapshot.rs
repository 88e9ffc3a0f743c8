//! Replication snapshot of one rank.
//!
//! The checker never looks at the objects themselves, only at this metadata:
//! which objects a rank holds locally, and for each, which other ranks hold a
//! replica of it and at which priority.

use serde::{Deserialize, Serialize};

use ddd_core::{Gid, ObjType, Priority, Rank};

/// "Object is also held by `rank` with priority `prio`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupling {
    pub rank: Rank,
    pub prio: Priority,
}

/// One locally held object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObject {
    pub gid: Gid,
    pub typ: ObjType,
    /// Priority of the local copy.
    pub prio: Priority,
    pub couplings: Vec<Coupling>,
}

impl LocalObject {
    pub fn new(gid: Gid, typ: ObjType, prio: Priority) -> Self {
        Self {
            gid,
            typ,
            prio,
            couplings: Vec::new(),
        }
    }

    /// Record a replica on `rank`.
    pub fn couple(mut self, rank: Rank, prio: Priority) -> Self {
        self.couplings.push(Coupling { rank, prio });
        self
    }

    /// The coupling to `rank`, if any.
    pub fn coupling(&self, rank: Rank) -> Option<&Coupling> {
        self.couplings.iter().find(|c| c.rank == rank)
    }
}

/// Everything one rank knows about replication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub objects: Vec<LocalObject>,
}

impl Snapshot {
    pub fn new(objects: Vec<LocalObject>) -> Self {
        Self { objects }
    }

    /// Local objects ordered by global id, for merge-joins.
    pub(crate) fn sorted(&self) -> Vec<&LocalObject> {
        let mut objects: Vec<&LocalObject> = self.objects.iter().collect();
        objects.sort_by_key(|o| o.gid);
        objects
    }

    /// Number of couplings over all objects.
    pub fn coupling_count(&self) -> usize {
        self.objects.iter().map(|o| o.couplings.len()).sum()
    }
}
