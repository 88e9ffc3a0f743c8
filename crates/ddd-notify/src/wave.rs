//! The two waves of a Notify round.
//!
//! [`merge_up`] runs leaves-to-root over Concentrate, [`route_down`] runs
//! root-to-leaves over Spread. Both must be executed by every rank, in that
//! order, even when the rank already knows the round has failed; the failure
//! travels as an exception code inside the packets.

use std::collections::BTreeMap;
use std::mem::size_of;
use std::sync::Arc;

use ddd_core::{ExceptionCode, Rank};
use ddd_transport::{Lease, MemClass, MemoryPool, Transport};

use crate::error::{NotifyError, Result};
use crate::record::{Classification, NotifyRecord, Packet};

/// Which child subtree each rank below this one lives in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<Rank, Rank>,
}

impl RoutingTable {
    fn insert(&mut self, rank: Rank, child: Rank) {
        self.routes.insert(rank, child);
    }

    /// The child through which `dest` is reached, if it is below us.
    pub fn child_for(&self, dest: Rank) -> Option<Rank> {
        self.routes.get(&dest).copied()
    }

    /// Number of ranks below this one.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// State a rank carries from the first wave into the second.
#[derive(Debug)]
pub struct UpWave {
    /// Routes learned from the children's placeholders.
    pub routes: RoutingTable,
    /// Records resolved at this rank, to be routed down in wave 2.
    pub kept: Vec<NotifyRecord>,
    /// Combined exception of this rank's subtree; at the root, of the run.
    pub exception: Option<ExceptionCode>,
    /// Scratch reservation for the merged record set.
    _scratch: Option<Lease>,
}

fn classify(me: Rank, routes: &RoutingTable, record: &mut NotifyRecord) {
    record.class = match record.to {
        None => Classification::Placeholder,
        Some(dest) if dest == me => Classification::SelfOnly,
        Some(dest) if routes.child_for(dest).is_some() => Classification::ResolvedLocally,
        Some(_) => Classification::Unresolved,
    };
}

/// Wave 1: merge the subtree's records bottom-up.
///
/// `own` must contain this rank's placeholder followed by its announcements.
pub async fn merge_up<T: Transport>(
    transport: &T,
    pool: &Arc<dyn MemoryPool>,
    own: Vec<NotifyRecord>,
    exception: Option<ExceptionCode>,
) -> Result<UpWave> {
    let me = transport.rank();
    let tree = transport.tree();

    let mut exception = exception;
    let mut records = own;
    let mut routes = RoutingTable::default();

    for &child in tree.children() {
        let packet = Packet::decode(&transport.concentrate_recv(child).await?)?;
        exception = ExceptionCode::merge(exception, packet.exception);
        for record in packet.records.iter().filter(|r| r.is_placeholder()) {
            routes.insert(record.from, child);
        }
        records.extend(packet.records);
    }

    let scratch = Lease::acquire(
        pool,
        MemClass::Temporary,
        records.len() * size_of::<NotifyRecord>(),
    );
    if scratch.is_none() {
        exception = ExceptionCode::merge(exception, Some(ExceptionCode::OUT_OF_MEMORY));
    }

    for record in records.iter_mut() {
        classify(me, &routes, record);
    }
    records.sort_by_key(|r| (r.to, r.from, r.index));

    let (forward, kept): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| {
        matches!(
            r.class,
            Classification::Unresolved | Classification::Placeholder
        )
    });

    if !tree.is_root() {
        let packet = Packet {
            exception,
            records: forward,
        };
        transport.concentrate_send(packet.encode()?).await?;
    } else if forward
        .iter()
        .any(|r| r.class == Classification::Unresolved)
    {
        // Every rank's placeholder reaches the root, so this only happens for
        // destinations outside the run.
        exception = ExceptionCode::merge(exception, Some(ExceptionCode::INVALID_DESTINATION));
    }

    tracing::trace!(
        rank = me.0,
        kept = kept.len(),
        subtree = routes.len() + 1,
        "notify: merged subtree"
    );

    Ok(UpWave {
        routes,
        kept,
        exception,
        _scratch: scratch,
    })
}

/// Wave 2: route resolved records top-down; returns the records addressed to
/// this rank, ordered by (source, announcement index).
pub async fn route_down<T: Transport>(transport: &T, up: UpWave) -> Result<Vec<NotifyRecord>> {
    let me = transport.rank();
    let tree = transport.tree();

    let (exception, mut records) = if !tree.is_root() {
        let packet = Packet::decode(&transport.spread_recv().await?)?;
        (packet.exception, packet.records)
    } else {
        (up.exception, Vec::new())
    };

    if let Some(code) = exception {
        let packet = Packet {
            exception,
            records: Vec::new(),
        }
        .encode()?;
        for &child in tree.children() {
            transport.spread_send(child, packet.clone()).await?;
        }
        return Err(NotifyError::Exception(code));
    }

    records.extend(up.kept);

    let mut mine = Vec::new();
    let mut buckets: BTreeMap<Rank, Vec<NotifyRecord>> =
        tree.children().iter().map(|&c| (c, Vec::new())).collect();
    let mut unroutable = None;

    for mut record in records {
        let Some(dest) = record.to else { continue };
        if dest == me {
            record.class = Classification::SelfOnly;
            mine.push(record);
            continue;
        }
        match up.routes.child_for(dest).and_then(|c| buckets.get_mut(&c)) {
            Some(bucket) => bucket.push(record),
            None => unroutable = Some(dest),
        }
    }

    for (child, records) in buckets {
        let packet = Packet {
            exception: None,
            records,
        };
        transport.spread_send(child, packet.encode()?).await?;
    }

    if let Some(dest) = unroutable {
        return Err(NotifyError::Unroutable { at: me, dest });
    }

    mine.sort_by_key(|r| (r.from, r.index));
    Ok(mine)
}
