//! The DDD context: one per rank.
//!
//! Bundles the transport, the memory pool, the LowComm layer and the
//! consistency checker behind one value, so higher layers pass a single
//! context around instead of process-wide state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ddd_cons::{ConsChecker, ConsConfig, ConsReport, Snapshot};
use ddd_core::Rank;
use ddd_lowcomm::{LowComm, LowCommConfig};
use ddd_notify::{Notifier, NotifyConfig};
use ddd_transport::{barrier, global_sum, MemoryPool, Transport};

use crate::error::Result;

/// Configuration for a [`Ddd`] context. Must be identical on every rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DddConfig {
    pub lowcomm: LowCommConfig,
    pub cons: ConsConfig,
}

impl DddConfig {
    /// Notify settings, shared by LowComm phases and standalone rounds.
    pub fn notify(&self) -> &NotifyConfig {
        &self.lowcomm.notify
    }
}

/// The per-rank DDD context.
pub struct Ddd<T: Transport> {
    lowcomm: LowComm<T>,
    cons: ConsChecker,
}

impl<T: Transport> Ddd<T> {
    /// Create a context.
    ///
    /// Registers the consistency checker's message types first, so every
    /// rank must create its context before registering its own types.
    pub fn new(transport: T, pool: Arc<dyn MemoryPool>, config: DddConfig) -> Self {
        let mut lowcomm = LowComm::new(transport, pool, config.lowcomm);
        let cons = ConsChecker::new(&mut lowcomm, config.cons);
        tracing::debug!(
            rank = lowcomm.rank().0,
            size = lowcomm.transport().size(),
            "ddd: context created"
        );
        Self { lowcomm, cons }
    }

    pub fn rank(&self) -> Rank {
        self.lowcomm.rank()
    }

    /// Number of ranks in the run.
    pub fn size(&self) -> usize {
        self.lowcomm.transport().size()
    }

    pub fn transport(&self) -> &T {
        self.lowcomm.transport()
    }

    pub fn lowcomm(&self) -> &LowComm<T> {
        &self.lowcomm
    }

    /// The LowComm layer, for registering types and running phases.
    pub fn lowcomm_mut(&mut self) -> &mut LowComm<T> {
        &mut self.lowcomm
    }

    /// A Notify handle for standalone rounds outside LowComm phases.
    pub fn notifier(&self) -> Notifier<'_, T> {
        let lc = &self.lowcomm;
        Notifier::new(lc.transport(), lc.pool(), &lc.config().notify)
    }

    pub fn cons_config(&self) -> &ConsConfig {
        self.cons.config()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collectives
    // ─────────────────────────────────────────────────────────────────────────

    /// Audit `snapshot` against the other ranks' snapshots. Collective.
    pub async fn cons_check(&mut self, snapshot: &Snapshot) -> Result<ConsReport> {
        Ok(self.cons.cons_check(&mut self.lowcomm, snapshot).await?)
    }

    /// Sum `value` over all ranks. Collective.
    pub async fn global_sum(&self, value: u64) -> Result<u64> {
        Ok(global_sum(self.transport(), value).await?)
    }

    /// Wait for every rank. Collective.
    pub async fn barrier(&self) -> Result<()> {
        Ok(barrier(self.transport()).await?)
    }
}
