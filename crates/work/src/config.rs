//! Tracking engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the tracking manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// How many times a load-apply-save cycle is re-run after the store
    /// reports a version conflict
    pub max_conflict_retries: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
        }
    }
}
