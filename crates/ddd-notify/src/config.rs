//! Notify configuration.

use serde::{Deserialize, Serialize};

/// Configuration for Notify rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Maximum number of announcements per rank and round.
    ///
    /// `None` means one per other rank, i.e. `size - 1`.
    pub max_announcements: Option<usize>,
}

impl NotifyConfig {
    /// Effective announcement limit for a run of `size` ranks.
    pub fn limit(&self, size: usize) -> usize {
        self.max_announcements
            .unwrap_or_else(|| size.saturating_sub(1))
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_announcements: None,
        }
    }
}
