//! chainwatch-balance: native balance tracking for a dynamic address set.
//!
//! Each tick snapshots the watched addresses, queries them in chunks of
//! `chunk_size` concurrently through a [`BalanceFetcher`], and emits a
//! [`BalanceChange`] for every address whose balance moved.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod watcher;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::BalanceWatcherConfig;
pub use error::BalanceError;
pub use fetcher::BalanceFetcher;
pub use watcher::{BalanceChange, BalanceStream, BalanceWatcher};
