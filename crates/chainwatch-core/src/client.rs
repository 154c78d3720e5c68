//! The chain-access capability consumed by the block watcher.

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{Log, LogFilter, MiniHeader};

/// Read access to a chain node.
///
/// Implementations translate the node's native header representation into
/// [`MiniHeader`] and must answer `ClientError::NotFound` (not a generic RPC
/// error) when a block does not exist yet or a hash is unknown.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch a header by number; `None` means the latest block.
    async fn header_by_number(&self, number: Option<u64>) -> Result<MiniHeader, ClientError>;

    /// Fetch a header by hash.
    async fn header_by_hash(&self, hash: B256) -> Result<MiniHeader, ClientError>;

    /// Fetch the logs selected by `filter`.
    async fn filter_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ClientError>;
}

#[async_trait]
impl<C: ChainClient + ?Sized> ChainClient for Arc<C> {
    async fn header_by_number(&self, number: Option<u64>) -> Result<MiniHeader, ClientError> {
        (**self).header_by_number(number).await
    }

    async fn header_by_hash(&self, hash: B256) -> Result<MiniHeader, ClientError> {
        (**self).header_by_hash(hash).await
    }

    async fn filter_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ClientError> {
        (**self).filter_logs(filter).await
    }
}
