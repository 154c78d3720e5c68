//! Error types for the header store, chain client and block watcher.

use alloy_primitives::B256;
use thiserror::Error;

/// Errors raised by a [`HeaderStore`](crate::store::HeaderStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An entry with the same number or the same hash is already stored.
    #[error("duplicate header: block {number} ({hash}) collides with a stored entry")]
    DuplicateHeader { number: u64, hash: B256 },

    /// `reset` was called with an id that is not the latest checkpoint.
    #[error("unknown checkpoint id {id}")]
    UnknownCheckpoint { id: u64 },
}

/// Errors returned by a [`ChainClient`](crate::client::ChainClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The requested block (by number or by hash) does not exist on the node.
    #[error("not found")]
    NotFound,

    /// Transport or node-side failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The request did not complete within the client's timeout.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The node answered with something that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Returns `true` if the node reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors surfaced by the [`BlockWatcher`](crate::watcher::BlockWatcher).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("block watcher is already running")]
    AlreadyRunning,

    #[error("header store error: {0}")]
    Store(#[from] StoreError),

    #[error("chain client error: {0}")]
    Client(#[from] ClientError),
}

impl WatchError {
    /// Returns `true` for failures the next tick is expected to recover from.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Client(_))
    }
}
