//! chainwatch-core: canonical-chain tracking for the chainwatch order watcher.
//!
//! # Architecture
//!
//! ```text
//! BlockWatcher ── poll loop (tokio task, one step per tick)
//!      ├── ChainClient      (header_by_number / header_by_hash / filter_logs)
//!      ├── HeaderStore      (bounded LIFO of recent MiniHeaders)
//!      ├── SubscriberSet    (ordered Vec<BlockEvent> batches, back-pressured)
//!      └── error channel    (bounded, drop-on-full diagnostics)
//! ```

pub mod chunk;
pub mod client;
pub mod config;
pub mod error;
pub mod store;
pub mod subscription;
pub mod types;
pub mod watcher;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use chunk::{chunk_block_range, BlockRange};
pub use client::ChainClient;
pub use config::{StartBlock, WatcherConfig, WatcherConfigBuilder};
pub use error::{ClientError, StoreError, WatchError};
pub use store::{HeaderStore, MemoryHeaderStore};
pub use subscription::{EventSink, SubscriberSet, Subscription, SubscriptionId};
pub use types::{BlockEvent, BlockSelection, EventKind, Log, LogFilter, MiniHeader};
pub use watcher::{BlockWatcher, ErrorStream};
