//! In-memory balance source for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chainwatch_core::ClientError;

use crate::fetcher::BalanceFetcher;

#[derive(Debug, Default)]
struct State {
    balances: HashMap<Address, U256>,
    failing: HashSet<Address>,
    calls: Vec<Vec<Address>>,
}

/// A [`BalanceFetcher`] answering from a mutable map.
///
/// Unknown addresses report zero. A chunk that contains an address marked
/// with [`fail_on`](Self::fail_on) fails as a whole.
#[derive(Debug, Default)]
pub struct FakeBalanceFetcher {
    state: Mutex<State>,
}

impl FakeBalanceFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: Address, balance: U256) {
        self.lock().balances.insert(address, balance);
    }

    pub fn fail_on(&self, address: Address) {
        self.lock().failing.insert(address);
    }

    pub fn recover(&self, address: Address) {
        self.lock().failing.remove(&address);
    }

    /// Every chunk queried so far, in call order.
    pub fn calls(&self) -> Vec<Vec<Address>> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BalanceFetcher for FakeBalanceFetcher {
    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<U256>, ClientError> {
        let mut state = self.lock();
        state.calls.push(addresses.to_vec());
        if let Some(bad) = addresses.iter().find(|a| state.failing.contains(*a)) {
            return Err(ClientError::Rpc(format!("balance query failed for {bad}")));
        }
        Ok(addresses
            .iter()
            .map(|a| state.balances.get(a).copied().unwrap_or_default())
            .collect())
    }
}
