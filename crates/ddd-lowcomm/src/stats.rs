//! Per-phase counters.

use serde::{Deserialize, Serialize};

/// What one communication phase moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub msgs_sent: usize,
    pub bytes_sent: usize,
    pub msgs_received: usize,
    pub bytes_received: usize,
    /// Times an allocation failure triggered a reclaim pass.
    pub reclaim_passes: usize,
    /// Send buffers freed by reclaim passes.
    pub buffers_reclaimed: usize,
}
