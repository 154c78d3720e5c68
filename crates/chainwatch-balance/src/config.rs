//! Balance watcher configuration.

use std::time::Duration;

use chainwatch_core::config::duration_ms;
use serde::{Deserialize, Serialize};

fn default_polling_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_chunk_size() -> usize {
    4000
}

/// Configuration for a [`BalanceWatcher`](crate::watcher::BalanceWatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceWatcherConfig {
    /// Delay between two polls.
    #[serde(
        rename = "polling_interval_ms",
        with = "duration_ms",
        default = "default_polling_interval"
    )]
    pub polling_interval: Duration,
    /// Maximum number of addresses sent in one balance query.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for BalanceWatcherConfig {
    fn default() -> Self {
        Self {
            polling_interval: default_polling_interval(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl BalanceWatcherConfig {
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}
