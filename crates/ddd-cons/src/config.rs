//! Consistency-check configuration.

use serde::{Deserialize, Serialize};

/// Which global coupling check `cons_check` runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsMode {
    /// Every coupling is checked against its mirror on the partner rank.
    #[default]
    Pairwise,
    /// Additionally, all holders of an object must agree on the full holder
    /// set and its priorities.
    AllToAll,
}

/// Configuration for the consistency checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsConfig {
    pub mode: ConsMode,
    /// Inconsistencies kept in a [`ConsReport`](crate::ConsReport); the rest
    /// are only counted.
    pub max_reported: usize,
}

impl Default for ConsConfig {
    fn default() -> Self {
        Self {
            mode: ConsMode::Pairwise,
            max_reported: 64,
        }
    }
}
