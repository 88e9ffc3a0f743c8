//! Proptest generators for property-based testing.

use proptest::prelude::*;

use ddd::core::Rank;
use ddd::lowcomm::MAX_COMPONENTS;

use crate::fixtures::ReplicationFixture;

/// A run size worth testing collectives on.
pub fn run_size() -> impl Strategy<Value = usize> {
    1usize..=9
}

/// Sends of every rank of a run of `size`: `traffic[src]` lists
/// `(dest, bytes)` pairs. Destinations are other ranks, at most one message
/// per pair.
pub fn traffic(size: usize, max_bytes: usize) -> impl Strategy<Value = Vec<Vec<(Rank, usize)>>> {
    let per_rank = (0..size as u32).map(move |src| {
        prop::collection::btree_map(0..size as u32, 0..=max_bytes, 0..size)
            .prop_map(move |sends| {
                sends
                    .into_iter()
                    .filter(|(dest, _)| *dest != src)
                    .map(|(dest, bytes)| (Rank(dest), bytes))
                    .collect::<Vec<_>>()
            })
    });
    per_rank.collect::<Vec<_>>()
}

/// A run size together with its traffic.
pub fn run_with_traffic(
    max_bytes: usize,
) -> impl Strategy<Value = (usize, Vec<Vec<(Rank, usize)>>)> {
    run_size().prop_flat_map(move |size| (Just(size), traffic(size, max_bytes)))
}

/// Shape of one component of a generated message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Table { entry_size: usize },
    Chunk,
}

/// A message type of one to [`MAX_COMPONENTS`] tables and chunks.
pub fn schema() -> impl Strategy<Value = Vec<Shape>> {
    let shape = prop_oneof![
        (1usize..=24).prop_map(|entry_size| Shape::Table { entry_size }),
        Just(Shape::Chunk),
    ];
    prop::collection::vec(shape, 1..=MAX_COMPONENTS)
}

/// Table entry counts and chunk sizes for one message. Empty components are
/// drawn often.
pub fn component_sizes(components: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(prop_oneof![1 => Just(0usize), 3 => 1usize..64], components)
}

/// A schema and, for each rank of a run of `size`, the component sizes of the
/// one message it sends.
pub fn schema_with_sizes(size: usize) -> impl Strategy<Value = (Vec<Shape>, Vec<Vec<usize>>)> {
    schema().prop_flat_map(move |shapes| {
        let sizes = prop::collection::vec(component_sizes(shapes.len()), size);
        (Just(shapes), sizes)
    })
}

/// A seeded random replication over `size` ranks.
pub fn replication(size: usize) -> impl Strategy<Value = ReplicationFixture> {
    (0usize..40, any::<u64>())
        .prop_map(move |(count, seed)| ReplicationFixture::generate(size, count, seed))
}
