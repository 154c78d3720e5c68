//! The balance watcher: periodic batched balance polling with change detection.
//!
//! Polls are serialized: the loop awaits each poll before waiting for the next
//! tick, so two polls never race on the same transition. Within one poll the
//! chunks are queried concurrently.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use futures::future;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::BalanceWatcherConfig;
use crate::error::BalanceError;
use crate::fetcher::BalanceFetcher;

/// A new balance observed for a watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub address: Address,
    pub balance: U256,
}

/// Receiving half of a balance-change stream.
pub type BalanceStream = mpsc::UnboundedReceiver<BalanceChange>;

struct Shared<F> {
    fetcher: F,
    config: BalanceWatcherConfig,
    balances: Mutex<BTreeMap<Address, U256>>,
    sinks: Mutex<Vec<mpsc::UnboundedSender<BalanceChange>>>,
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Tracks the last-known balance of a set of addresses.
pub struct BalanceWatcher<F> {
    shared: Arc<Shared<F>>,
    running: Mutex<Option<Running>>,
}

impl<F: BalanceFetcher> BalanceWatcher<F> {
    pub fn new(fetcher: F, config: BalanceWatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                config,
                balances: Mutex::new(BTreeMap::new()),
                sinks: Mutex::new(Vec::new()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BalanceWatcherConfig {
        &self.shared.config
    }

    /// Start tracking `address` with a known balance.
    ///
    /// No-op if the address is already tracked; the stored balance is kept.
    pub fn add(&self, address: Address, initial: U256) {
        self.shared.lock_balances().entry(address).or_insert(initial);
    }

    /// [`add`](Self::add) every pair in `entries`.
    pub fn add_many(&self, entries: impl IntoIterator<Item = (Address, U256)>) {
        let mut balances = self.shared.lock_balances();
        for (address, initial) in entries {
            balances.entry(address).or_insert(initial);
        }
    }

    /// Stop tracking `address`. Returns its last balance if it was tracked.
    pub fn remove(&self, address: &Address) -> Option<U256> {
        self.shared.lock_balances().remove(address)
    }

    pub fn get(&self, address: &Address) -> Result<U256, BalanceError> {
        self.shared
            .lock_balances()
            .get(address)
            .copied()
            .ok_or(BalanceError::NotTracked(*address))
    }

    /// Number of tracked addresses.
    pub fn watched(&self) -> usize {
        self.shared.lock_balances().len()
    }

    /// Open a new stream of balance changes.
    ///
    /// Every stream receives every change emitted after it was opened.
    pub fn receive(&self) -> BalanceStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.lock_sinks().push(tx);
        rx
    }

    /// Run one poll now and return the changes it emitted.
    pub async fn poll_once(&self) -> Vec<BalanceChange> {
        self.shared.poll().await
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: BalanceFetcher + 'static> BalanceWatcher<F> {
    /// Spawn the polling loop. Fails with [`BalanceError::AlreadyRunning`] if
    /// the loop is active.
    pub fn start(&self) -> Result<(), BalanceError> {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(BalanceError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(Arc::clone(&self.shared), stop_rx));
        tracing::info!(
            interval_ms = self.shared.config.polling_interval.as_millis() as u64,
            chunk_size = self.shared.config.chunk_size,
            "Balance watcher started"
        );
        *running = Some(Running { stop_tx, handle });
        Ok(())
    }

    /// Signal the loop to stop and wait for it to exit. No-op when stopped.
    pub async fn stop(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };
        let _ = running.stop_tx.send(true);
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Balance watcher task ended abnormally");
        }
        tracing::info!("Balance watcher stopped");
    }
}

impl<F> Drop for BalanceWatcher<F> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            let _ = running.stop_tx.send(true);
        }
    }
}

async fn poll_loop<F: BalanceFetcher>(shared: Arc<Shared<F>>, mut stop: watch::Receiver<bool>) {
    let period = shared.config.polling_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }
        shared.poll().await;
    }
}

impl<F: BalanceFetcher> Shared<F> {
    async fn poll(&self) -> Vec<BalanceChange> {
        let addresses: Vec<Address> = self.lock_balances().keys().copied().collect();
        if addresses.is_empty() {
            return Vec::new();
        }

        let chunks: Vec<&[Address]> = addresses.chunks(self.config.chunk_size.max(1)).collect();
        tracing::debug!(
            addresses = addresses.len(),
            chunks = chunks.len(),
            "Polling balances"
        );

        let results =
            future::join_all(chunks.iter().map(|chunk| self.fetcher.get_balances(chunk))).await;

        let mut changes = Vec::new();
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(balances) if balances.len() == chunk.len() => {
                    let applied = self.apply(chunk, &balances);
                    self.emit(&applied);
                    changes.extend(applied);
                }
                Ok(balances) => tracing::warn!(
                    expected = chunk.len(),
                    actual = balances.len(),
                    "Balance response misaligned, dropping chunk"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    addresses = chunk.len(),
                    "Balance query failed, dropping chunk"
                ),
            }
        }
        changes
    }

    /// Store every balance that differs from the tracked one. Addresses
    /// removed since the snapshot are skipped.
    fn apply(&self, chunk: &[Address], balances: &[U256]) -> Vec<BalanceChange> {
        let mut tracked = self.lock_balances();
        let mut changes = Vec::new();
        for (address, balance) in chunk.iter().zip(balances) {
            let Some(stored) = tracked.get_mut(address) else {
                continue;
            };
            if stored != balance {
                *stored = *balance;
                tracing::debug!(address = %address, balance = %balance, "Balance changed");
                changes.push(BalanceChange {
                    address: *address,
                    balance: *balance,
                });
            }
        }
        changes
    }

    fn emit(&self, changes: &[BalanceChange]) {
        if changes.is_empty() {
            return;
        }
        let mut sinks = self.lock_sinks();
        sinks.retain(|sink| changes.iter().all(|c| sink.send(c.clone()).is_ok()));
    }

    fn lock_balances(&self) -> MutexGuard<'_, BTreeMap<Address, U256>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_sinks(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<BalanceChange>>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
