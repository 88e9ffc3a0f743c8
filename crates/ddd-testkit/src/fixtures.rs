//! Replication fixtures.
//!
//! A [`ReplicationFixture`] is the global truth of a run: every object with
//! the full list of ranks holding it. From it, each rank's local
//! [`Snapshot`] is derived, consistent by construction, and faults can be
//! injected into single snapshots.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use ddd::core::{Gid, ObjType, Priority, Rank};
use ddd::{LocalObject, Snapshot};

/// One object and every copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatedObject {
    pub gid: Gid,
    pub typ: ObjType,
    /// Holding ranks and the priority of each copy; ranks are distinct.
    pub holders: Vec<(Rank, Priority)>,
}

/// The replication state of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationFixture {
    pub size: usize,
    pub objects: Vec<ReplicatedObject>,
}

/// A priority fault injected by [`ReplicationFixture::with_priority_fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFault {
    pub gid: Gid,
    /// The rank whose coupling was altered.
    pub at: Rank,
    /// The rank the altered coupling points to.
    pub holder: Rank,
    pub actual: Priority,
    pub recorded: Priority,
}

impl ReplicationFixture {
    pub fn new(size: usize, objects: Vec<ReplicatedObject>) -> Self {
        Self { size, objects }
    }

    /// Random replication over `size` ranks, deterministic in `seed`.
    ///
    /// Each object lives on one to four ranks; the first holder is the
    /// master copy.
    pub fn generate(size: usize, count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut gid = 0u64;
        let objects = (0..count)
            .map(|_| {
                gid += rng.gen_range(1..16);
                let copies = rng.gen_range(1..=size.min(4));
                let holders = index::sample(&mut rng, size, copies)
                    .into_iter()
                    .enumerate()
                    .map(|(i, rank)| {
                        let prio = if i == 0 {
                            Priority::MASTER
                        } else {
                            Priority(rng.gen_range(1..4))
                        };
                        (Rank(rank as u32), prio)
                    })
                    .collect();
                ReplicatedObject {
                    gid: Gid(gid),
                    typ: ObjType(rng.gen_range(1..4)),
                    holders,
                }
            })
            .collect();
        Self { size, objects }
    }

    /// The snapshot of `rank`: every object it holds, coupled to all other
    /// holders.
    pub fn snapshot(&self, rank: Rank) -> Snapshot {
        let objects = self
            .objects
            .iter()
            .filter_map(|obj| {
                let &(_, prio) = obj.holders.iter().find(|(r, _)| *r == rank)?;
                let local = obj
                    .holders
                    .iter()
                    .filter(|(r, _)| *r != rank)
                    .fold(LocalObject::new(obj.gid, obj.typ, prio), |o, &(r, p)| {
                        o.couple(r, p)
                    });
                Some(local)
            })
            .collect();
        Snapshot::new(objects)
    }

    /// Snapshots of all ranks, in rank order.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        Rank::all(self.size).map(|r| self.snapshot(r)).collect()
    }

    /// The first object held by at least two ranks.
    pub fn shared_object(&self) -> Option<&ReplicatedObject> {
        self.objects.iter().find(|o| o.holders.len() >= 2)
    }

    /// Snapshots where the first holder of a shared object records a wrong
    /// priority for the second holder's copy.
    pub fn with_priority_fault(&self) -> Option<(Vec<Snapshot>, PriorityFault)> {
        let obj = self.shared_object()?;
        let (at, _) = obj.holders[0];
        let (holder, actual) = obj.holders[1];
        let recorded = Priority(actual.0.wrapping_add(1));

        let mut snapshots = self.snapshots();
        let local = snapshots[at.index()]
            .objects
            .iter_mut()
            .find(|o| o.gid == obj.gid)?;
        local.couplings.iter_mut().find(|c| c.rank == holder)?.prio = recorded;

        Some((
            snapshots,
            PriorityFault {
                gid: obj.gid,
                at,
                holder,
                actual,
                recorded,
            },
        ))
    }
}
