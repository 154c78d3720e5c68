//! The batched balance query consumed by the balance watcher.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chainwatch_core::ClientError;

/// Aggregate native-balance lookup.
///
/// The returned vector must be aligned with `addresses`: one balance per
/// address, in the same order.
#[async_trait]
pub trait BalanceFetcher: Send + Sync {
    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<U256>, ClientError>;
}

#[async_trait]
impl<F: BalanceFetcher + ?Sized> BalanceFetcher for Arc<F> {
    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<U256>, ClientError> {
        (**self).get_balances(addresses).await
    }
}
