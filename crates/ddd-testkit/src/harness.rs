//! Running all ranks of a run inside one test.
//!
//! Each rank is a tokio task driving its own endpoint of a shared
//! [`MemoryNetwork`]. The collectives only make progress when every rank
//! runs, so tests need a multi-threaded runtime or must never block a
//! worker thread.

use std::future::Future;
use std::sync::Arc;

use ddd::core::Rank;
use ddd::transport::{HeapPool, MemoryNetwork, MemoryPool, MemoryTransport};
use ddd::{Ddd, DddConfig};

/// Run `body` once per rank of `network` and collect the results in rank
/// order.
///
/// # Panics
/// If any rank panics.
pub async fn run_ranks<F, Fut, R>(network: &Arc<MemoryNetwork>, body: F) -> Vec<R>
where
    F: Fn(MemoryTransport) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let handles: Vec<_> = network
        .transports()
        .into_iter()
        .map(|transport| tokio::spawn(body(transport)))
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (rank, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => panic!("rank {rank} failed: {e}"),
        }
    }
    results
}

/// Run `body` once per rank with a fresh [`Ddd`] context over a heap pool.
pub async fn run_ddd<F, Fut, R>(size: usize, config: DddConfig, body: F) -> Vec<R>
where
    F: Fn(Ddd<MemoryTransport>) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    run_ddd_with_pools(size, config, |_| HeapPool::new(), body).await
}

/// Like [`run_ddd`], with the pool of each rank chosen by `pool`.
pub async fn run_ddd_with_pools<P, F, Fut, R>(
    size: usize,
    config: DddConfig,
    pool: P,
    body: F,
) -> Vec<R>
where
    P: Fn(Rank) -> Arc<dyn MemoryPool>,
    F: Fn(Ddd<MemoryTransport>) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let network = MemoryNetwork::new(size);
    run_ranks(&network, |transport| {
        let rank = ddd::Transport::rank(&transport);
        body(Ddd::new(transport, pool(rank), config.clone()))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_results_in_rank_order() {
        let ranks = run_ddd(5, DddConfig::default(), |ddd| async move {
            ddd.barrier().await.unwrap();
            ddd.rank()
        })
        .await;
        assert_eq!(ranks, Rank::all(5).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_global_sum_over_ranks() {
        let sums = run_ddd(4, DddConfig::default(), |ddd| async move {
            ddd.global_sum(ddd.rank().0 as u64).await.unwrap()
        })
        .await;
        assert_eq!(sums, vec![6; 4]);
    }
}
