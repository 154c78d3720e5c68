//! Block watcher configuration.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use chainwatch_core::config::{StartBlock, WatcherConfig};
//!
//! let config = WatcherConfig::builder()
//!     .polling_interval(Duration::from_millis(500))
//!     .start_block(StartBlock::Number(19_000_000))
//!     .retention_limit(64)
//!     .build();
//! assert_eq!(config.retention_limit, 64);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

// ─── StartBlock ──────────────────────────────────────────────────────────────

/// Where the watcher begins when its header store is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartBlock {
    /// Whatever the node reports as its latest block.
    #[default]
    Latest,
    /// A fixed block number.
    #[serde(untagged)]
    Number(u64),
}

impl StartBlock {
    /// `None` for latest, `Some(n)` for a fixed number.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Latest => None,
            Self::Number(n) => Some(*n),
        }
    }
}

impl fmt::Display for StartBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for StartBlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.parse::<u64>()
            .map(Self::Number)
            .map_err(|e| format!("invalid start block '{s}': {e}"))
    }
}

// ─── WatcherConfig ───────────────────────────────────────────────────────────

fn default_polling_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_retention_limit() -> usize {
    20
}

fn default_with_logs() -> bool {
    true
}

fn default_error_channel_capacity() -> usize {
    5
}

/// Configuration for a [`BlockWatcher`](crate::watcher::BlockWatcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Delay between two polls.
    #[serde(
        rename = "polling_interval_ms",
        with = "duration_ms",
        default = "default_polling_interval"
    )]
    pub polling_interval: Duration,
    /// First block to fetch when the store is empty.
    #[serde(default)]
    pub start_block: StartBlock,
    /// Maximum number of headers kept in the store.
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,
    /// Fetch the logs of every added block.
    #[serde(default = "default_with_logs")]
    pub with_logs: bool,
    /// Topic-0 filter applied when fetching logs (empty = all events).
    #[serde(default)]
    pub topics: Vec<B256>,
    /// Capacity of the diagnostic error channel.
    #[serde(default = "default_error_channel_capacity")]
    pub error_channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            polling_interval: default_polling_interval(),
            start_block: StartBlock::Latest,
            retention_limit: default_retention_limit(),
            with_logs: default_with_logs(),
            topics: Vec::new(),
            error_channel_capacity: default_error_channel_capacity(),
        }
    }
}

impl WatcherConfig {
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::new()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Fluent builder for [`WatcherConfig`].
#[derive(Debug, Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: WatcherConfig::default(),
        }
    }

    /// Set the delay between two polls.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval = interval;
        self
    }

    /// Set the block the watcher starts from when its store is empty.
    pub fn start_block(mut self, start: StartBlock) -> Self {
        self.config.start_block = start;
        self
    }

    /// Set the number of headers kept in the store.
    pub fn retention_limit(mut self, limit: usize) -> Self {
        self.config.retention_limit = limit;
        self
    }

    /// Enable or disable log fetching for added blocks.
    pub fn with_logs(mut self, enabled: bool) -> Self {
        self.config.with_logs = enabled;
        self
    }

    /// Add a topic-0 value to the log filter.
    pub fn topic(mut self, topic: B256) -> Self {
        self.config.topics.push(topic);
        self
    }

    /// Replace the topic-0 filter.
    pub fn topics(mut self, topics: impl IntoIterator<Item = B256>) -> Self {
        self.config.topics = topics.into_iter().collect();
        self
    }

    pub fn error_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.error_channel_capacity = capacity;
        self
    }

    pub fn build(self) -> WatcherConfig {
        self.config
    }
}

// ─── Duration as milliseconds ────────────────────────────────────────────────

/// `serde(with)` helper encoding a [`Duration`] as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
