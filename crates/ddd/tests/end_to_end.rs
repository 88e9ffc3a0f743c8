//! Multi-rank LowComm phases through the `Ddd` context.

use std::sync::Arc;

use ddd::notify::ExpectedRecv;
use ddd::{Comp, DddConfig, ExceptionCode, Rank};
use ddd_testkit::generators::{run_with_traffic, schema_with_sizes, Shape};
use ddd_testkit::{init_test_logging, run_ddd};
use proptest::prelude::*;

fn pattern(src: u32, dest: u32, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (src * 31 + dest * 7 + i as u32) as u8)
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
struct Received {
    src: Rank,
    entries: Vec<u64>,
    chunk: Vec<u8>,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_four_rank_scenario() {
    init_test_logging();

    let received = run_ddd(4, DddConfig::default(), |mut ddd| async move {
        let lc = ddd.lowcomm_mut();
        let ty = lc.new_msg_type("xfer");
        let objs = lc.new_table(ty, "objs", 8);
        let data = lc.new_chunk(ty, "data");

        let mut sends = Vec::new();
        if lc.rank() == Rank(0) {
            let to3 = lc.new_send_msg(ty, Rank(3));
            lc.set_table_len(to3, objs, 10);
            let to1 = lc.new_send_msg(ty, Rank(1));
            lc.set_chunk_size(to1, data, 100);

            lc.prepare_send(to3).unwrap();
            for (i, entry) in lc.table_mut(to3, objs).chunks_exact_mut(8).enumerate() {
                entry.copy_from_slice(&(1000 + i as u64).to_le_bytes());
            }
            lc.prepare_send(to1).unwrap();
            lc.chunk_mut(to1, data).copy_from_slice(&pattern(0, 1, 100));
            sends = vec![to3, to1];
        }

        let expected = lc.connect(ty).await.unwrap();
        for &msg in &sends {
            lc.send(msg).unwrap();
        }
        let recvs = lc.communicate().await.unwrap();
        assert_eq!(recvs.len(), expected);

        let out: Vec<Received> = recvs
            .iter()
            .map(|&r| Received {
                src: lc.recv_src(r),
                entries: lc
                    .table_entries(r, objs)
                    .map(|e| {
                        let mut word = [0u8; 8];
                        word.copy_from_slice(e);
                        u64::from_le_bytes(word)
                    })
                    .collect(),
                chunk: lc.chunk(r, data).to_vec(),
            })
            .collect();
        lc.cleanup();
        out
    })
    .await;

    assert!(received[0].is_empty());
    assert!(received[2].is_empty());
    assert_eq!(
        received[1],
        vec![Received {
            src: Rank(0),
            entries: vec![],
            chunk: pattern(0, 1, 100),
        }]
    );
    assert_eq!(
        received[3],
        vec![Received {
            src: Rank(0),
            entries: (1000..1010).collect(),
            chunk: vec![],
        }]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_too_many_sends_seen_everywhere_then_recover() {
    let size = 4u32;
    let results = run_ddd(size as usize, DddConfig::default(), move |mut ddd| async move {
        let lc = ddd.lowcomm_mut();
        let ty = lc.new_msg_type("burst");
        let data = lc.new_chunk(ty, "data");
        let me = lc.rank();

        if me == Rank(1) {
            for _ in 0..size {
                let m = lc.new_send_msg(ty, Rank(2));
                lc.set_chunk_size(m, data, 8);
            }
        }
        let code = lc.connect(ty).await.unwrap_err().exception();
        lc.cleanup();

        // The same context runs a clean ring phase afterwards.
        let next = Rank((me.0 + 1) % size);
        let m = lc.new_send_msg(ty, next);
        lc.set_chunk_size(m, data, 3);
        lc.prepare_send(m).unwrap();
        lc.chunk_mut(m, data).copy_from_slice(&pattern(me.0, next.0, 3));
        lc.connect(ty).await.unwrap();
        lc.send(m).unwrap();
        let recvs = lc.communicate().await.unwrap();
        let prev = (me.0 + size - 1) % size;
        assert_eq!(lc.chunk(recvs[0], data), pattern(prev, me.0, 3).as_slice());
        lc.cleanup();

        code
    })
    .await;

    assert!(results.iter().all(|&c| c == ExceptionCode::TOO_MANY_SENDS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abort_propagates_most_negative_code() {
    let custom = ExceptionCode::new(-20).unwrap();
    let results = run_ddd(5, DddConfig::default(), move |mut ddd| async move {
        let lc = ddd.lowcomm_mut();
        let ty = lc.new_msg_type("empty");
        let code = match lc.rank().0 {
            1 => lc.abort(ExceptionCode::OUT_OF_MEMORY).await,
            4 => lc.abort(custom).await,
            _ => lc.connect(ty).await.unwrap_err().exception(),
        };
        lc.cleanup();
        code
    })
    .await;

    assert!(results.iter().all(|&c| c == custom));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_standalone_notify_round() {
    let size = 6u32;
    let results = run_ddd(size as usize, DddConfig::default(), move |ddd| async move {
        let me = ddd.rank();
        let notifier = ddd.notifier();
        let mut round = notifier.begin(1);
        round.announce(Rank((me.0 + 1) % size), u64::from(me.0) * 10);
        let expected = round.notify().await.unwrap();
        round.end();
        expected
    })
    .await;

    for (rank, expected) in results.iter().enumerate() {
        let prev = (rank as u32 + size - 1) % size;
        assert_eq!(
            expected,
            &vec![ExpectedRecv {
                src: Rank(prev),
                size: u64::from(prev) * 10,
            }]
        );
    }
}

fn exchange(size: usize, traffic: Vec<Vec<(Rank, usize)>>) -> Vec<Vec<(Rank, Vec<u8>)>> {
    let traffic = Arc::new(traffic);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .unwrap();

    runtime.block_on(run_ddd(size, DddConfig::default(), move |mut ddd| {
        let traffic = Arc::clone(&traffic);
        async move {
            let lc = ddd.lowcomm_mut();
            let ty = lc.new_msg_type("payload");
            let data = lc.new_chunk(ty, "data");
            let me = lc.rank();

            let mut sends = Vec::new();
            for &(dest, bytes) in &traffic[me.index()] {
                let m = lc.new_send_msg(ty, dest);
                lc.set_chunk_size(m, data, bytes);
                lc.prepare_send(m).unwrap();
                lc.chunk_mut(m, data).copy_from_slice(&pattern(me.0, dest.0, bytes));
                sends.push(m);
            }
            lc.connect(ty).await.unwrap();
            for &m in &sends {
                lc.send(m).unwrap();
            }
            let recvs = lc.communicate().await.unwrap();
            let got = recvs
                .iter()
                .map(|&r| (lc.recv_src(r), lc.chunk(r, data).to_vec()))
                .collect();
            lc.cleanup();
            got
        }
    }))
}

fn ring_schema() -> impl Strategy<Value = (usize, (Vec<Shape>, Vec<Vec<usize>>))> {
    (2usize..=4).prop_flat_map(|size| (Just(size), schema_with_sizes(size)))
}

/// Every rank sends one message of the generated schema to the next rank in
/// a ring; returns what each rank received as (entry count, bytes) per
/// component.
fn ring_with_schema(
    size: usize,
    shapes: Vec<Shape>,
    sizes: Vec<Vec<usize>>,
) -> Vec<(Rank, Vec<(usize, Vec<u8>)>)> {
    let shapes = Arc::new(shapes);
    let sizes = Arc::new(sizes);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .unwrap();

    runtime.block_on(run_ddd(size, DddConfig::default(), move |mut ddd| {
        let shapes = Arc::clone(&shapes);
        let sizes = Arc::clone(&sizes);
        async move {
            let lc = ddd.lowcomm_mut();
            let ty = lc.new_msg_type("mixed");
            let comps: Vec<Comp> = shapes
                .iter()
                .enumerate()
                .map(|(i, shape)| match *shape {
                    Shape::Table { entry_size } => {
                        lc.new_table(ty, &format!("table{i}"), entry_size)
                    }
                    Shape::Chunk => lc.new_chunk(ty, &format!("chunk{i}")),
                })
                .collect();

            let me = lc.rank();
            let next = Rank((me.0 + 1) % size as u32);
            let m = lc.new_send_msg(ty, next);
            for ((&comp, shape), &n) in comps.iter().zip(shapes.iter()).zip(&sizes[me.index()]) {
                match shape {
                    Shape::Table { .. } => lc.set_table_len(m, comp, n),
                    Shape::Chunk => lc.set_chunk_size(m, comp, n),
                }
            }
            lc.prepare_send(m).unwrap();
            for (i, (&comp, shape)) in comps.iter().zip(shapes.iter()).enumerate() {
                let payload = match shape {
                    Shape::Table { .. } => lc.table_mut(m, comp),
                    Shape::Chunk => lc.chunk_mut(m, comp),
                };
                let bytes = pattern(me.0, i as u32, payload.len());
                payload.copy_from_slice(&bytes);
            }

            assert_eq!(lc.connect(ty).await.unwrap(), 1);
            lc.send(m).unwrap();
            let recvs = lc.communicate().await.unwrap();
            let r = recvs[0];
            let got = comps
                .iter()
                .zip(shapes.iter())
                .map(|(&comp, shape)| match shape {
                    Shape::Table { .. } => (lc.table_len(r, comp), lc.table(r, comp).to_vec()),
                    Shape::Chunk => (lc.chunk_size(r, comp), lc.chunk(r, comp).to_vec()),
                })
                .collect();
            let src = lc.recv_src(r);
            lc.cleanup();
            (src, got)
        }
    }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_payload_arrives_at_its_destination((size, traffic) in run_with_traffic(300)) {
        let received = exchange(size, traffic.clone());

        for (dest, got) in received.iter().enumerate() {
            let mut expected: Vec<(Rank, Vec<u8>)> = traffic
                .iter()
                .enumerate()
                .flat_map(|(src, sends)| {
                    sends
                        .iter()
                        .filter(|(d, _)| d.index() == dest)
                        .map(move |&(_, bytes)| {
                            (Rank(src as u32), pattern(src as u32, dest as u32, bytes))
                        })
                })
                .collect();
            expected.sort();
            prop_assert_eq!(got, &expected);
        }
    }

    #[test]
    fn any_schema_round_trips((size, (shapes, sizes)) in ring_schema()) {
        let received = ring_with_schema(size, shapes.clone(), sizes.clone());

        for (dest, (src, components)) in received.iter().enumerate() {
            let prev = (dest + size - 1) % size;
            prop_assert_eq!(*src, Rank(prev as u32));
            for (i, (shape, (entries, bytes))) in shapes.iter().zip(components).enumerate() {
                let n = sizes[prev][i];
                let len = match shape {
                    Shape::Table { entry_size } => n * entry_size,
                    Shape::Chunk => n,
                };
                prop_assert_eq!(*entries, n);
                prop_assert_eq!(bytes, &pattern(prev as u32, i as u32, len));
            }
        }
    }
}
