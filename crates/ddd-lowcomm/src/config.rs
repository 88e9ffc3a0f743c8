//! LowComm configuration.

use ddd_notify::NotifyConfig;
use serde::{Deserialize, Serialize};

/// Upper bound on components per message type.
pub const MAX_COMPONENTS: usize = 8;

/// Configuration for a [`LowComm`](crate::LowComm) context.
///
/// Must be identical on every rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowCommConfig {
    /// Magic number at the start of every message buffer.
    pub magic: u32,
    /// Maximum number of message types the registry accepts.
    pub max_msg_types: usize,
    /// Settings for the Notify rounds run by `connect`.
    pub notify: NotifyConfig,
}

impl Default for LowCommConfig {
    fn default() -> Self {
        Self {
            magic: 0x4c43_4d31,
            max_msg_types: 32,
            notify: NotifyConfig::default(),
        }
    }
}
