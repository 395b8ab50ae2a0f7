//! Per-store configuration
//!
//! Settings that alter engine behavior. Owned by store administration
//! (external); the engine reads them through the identity provider.

use serde::{Deserialize, Serialize};

/// Store-level flags and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// When set, Worker-role staff may reset/delete non-pending orders.
    #[serde(default)]
    pub can_workers_reset: bool,
    /// Stock at or below this (and above zero) counts as "almost out".
    #[serde(default = "default_almost_out")]
    pub almost_out_threshold: i64,
}

fn default_almost_out() -> i64 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            can_workers_reset: false,
            almost_out_threshold: default_almost_out(),
        }
    }
}
