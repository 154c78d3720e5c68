//! The block watcher: a reorg-aware polling loop over a [`HeaderStore`].
//!
//! # Poll step
//!
//! ```text
//! top = store.peek()
//! next = client.header_by_number(top + 1 | start_block)      NotFound → no-op
//! while store.top exists and next.parent_hash != top.hash:   (rewind)
//!     pop top, emit Removed(top)
//!     next = client.header_by_hash(next.parent_hash)         NotFound → stop
//! push the collected headers oldest first, emit Added(h)     (replay)
//! publish the batch to every subscriber
//! ```
//!
//! The rewind is iterative; its depth is bounded by the store's retention
//! limit. When a walked-back parent cannot be found, nothing is pushed: the
//! removals already made are still published and the next tick refetches
//! from the new top.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::chunk::chunk_block_range;
use crate::client::ChainClient;
use crate::config::WatcherConfig;
use crate::error::{ClientError, WatchError};
use crate::store::{HeaderStore, MemoryHeaderStore};
use crate::subscription::{EventSink, SubscriberSet, Subscription};
use crate::types::{BlockEvent, Log, LogFilter, MiniHeader};

/// Receiving half of the diagnostic error channel.
pub type ErrorStream = mpsc::Receiver<WatchError>;

struct Shared<C, S> {
    client: C,
    store: S,
    config: WatcherConfig,
    subscribers: SubscriberSet,
    /// Held for a whole poll step; the store has a single writer.
    step: tokio::sync::Mutex<()>,
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Tracks the canonical chain tip and publishes add/remove batches.
pub struct BlockWatcher<C, S = MemoryHeaderStore> {
    shared: Arc<Shared<C, S>>,
    running: Mutex<Option<Running>>,
}

impl<C: ChainClient> BlockWatcher<C, MemoryHeaderStore> {
    /// Create a watcher backed by an in-memory store sized by
    /// `config.retention_limit`.
    pub fn new(client: C, config: WatcherConfig) -> Self {
        let store = MemoryHeaderStore::new(config.retention_limit);
        Self::with_store(client, store, config)
    }
}

impl<C: ChainClient, S: HeaderStore> BlockWatcher<C, S> {
    /// Create a watcher over a caller-supplied store.
    pub fn with_store(client: C, store: S, config: WatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                store,
                config,
                subscribers: SubscriberSet::new(),
                step: tokio::sync::Mutex::new(()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    pub fn client(&self) -> &C {
        &self.shared.client
    }

    /// Register a sink for event batches.
    pub fn subscribe(&self, sink: EventSink) -> Subscription {
        self.shared.subscribers.subscribe(sink)
    }

    /// Headers currently retained, ascending by number.
    pub fn retained_headers(&self) -> Vec<MiniHeader> {
        self.shared.store.peek_all()
    }

    /// Run one poll step now and publish its events.
    ///
    /// Returns the published batch. On failure the events produced before the
    /// error have still been published. Steps are serialized with the polling
    /// loop and with concurrent callers.
    pub async fn poll_next_block(&self) -> Result<Vec<BlockEvent>, WatchError> {
        self.shared.poll_next_block().await
    }

    /// Fetch logs for `[from, to]` in chunks of `chunk_size` blocks, using the
    /// watcher's topic filter.
    pub async fn logs_in_range(
        &self,
        from: u64,
        to: u64,
        chunk_size: u64,
    ) -> Result<Vec<Log>, ClientError> {
        let mut logs = Vec::new();
        for range in chunk_block_range(from, to, chunk_size) {
            let filter = LogFilter::range(range.from, range.to)
                .with_topics(self.shared.config.topics.iter().copied());
            let chunk = self.shared.client.filter_logs(&filter).await?;
            tracing::debug!(
                from = range.from,
                to = range.to,
                logs = chunk.len(),
                "Fetched log chunk"
            );
            logs.extend(chunk);
        }
        Ok(logs)
    }

    /// Returns `true` while the polling task is active.
    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C, S> BlockWatcher<C, S>
where
    C: ChainClient + 'static,
    S: HeaderStore + 'static,
{
    /// Spawn the polling loop.
    ///
    /// Returns the diagnostic error channel; it is closed once the loop exits.
    /// Fails with [`WatchError::AlreadyRunning`] if the loop is active.
    pub fn start_polling(&self) -> Result<ErrorStream, WatchError> {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(WatchError::AlreadyRunning);
        }

        let capacity = self.shared.config.error_channel_capacity.max(1);
        let (err_tx, err_rx) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(Arc::clone(&self.shared), err_tx, stop_rx));

        tracing::info!(
            interval_ms = self.shared.config.polling_interval.as_millis() as u64,
            start = %self.shared.config.start_block,
            retention = self.shared.config.retention_limit,
            "Block watcher started"
        );
        *running = Some(Running { stop_tx, handle });
        Ok(err_rx)
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// An in-flight poll step runs to completion first. No-op when stopped.
    pub async fn stop_polling(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };
        let _ = running.stop_tx.send(true);
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Block watcher task ended abnormally");
        }
        tracing::info!("Block watcher stopped");
    }
}

impl<C, S> Drop for BlockWatcher<C, S> {
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

// ─── Poll loop ───────────────────────────────────────────────────────────────

async fn poll_loop<C: ChainClient, S: HeaderStore>(
    shared: Arc<Shared<C, S>>,
    errors: mpsc::Sender<WatchError>,
    mut stop: watch::Receiver<bool>,
) {
    let period = shared.config.polling_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }
        if let Err(err) = shared.poll_next_block().await {
            report(&errors, err);
        }
    }
}

/// Post `err` to the diagnostic channel, dropping it when the channel is full.
fn report(errors: &mpsc::Sender<WatchError>, err: WatchError) {
    tracing::warn!(error = %err, "Block watcher poll failed");
    match errors.try_send(err) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(err)) => {
            tracing::debug!(error = %err, "Error channel full, dropping error");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

impl<C: ChainClient, S: HeaderStore> Shared<C, S> {
    async fn poll_next_block(&self) -> Result<Vec<BlockEvent>, WatchError> {
        let _step = self.step.lock().await;
        let target = match self.store.peek() {
            Some(top) => Some(top.number + 1),
            None => self.config.start_block.as_number(),
        };
        tracing::debug!(block = ?target, "Polling for next block");

        let next = match self.client.header_by_number(target).await {
            Ok(header) => header,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        let result = self.build_canonical_chain(next, &mut events).await;
        if !events.is_empty() {
            self.subscribers.publish(&events).await;
        }
        result.map(|()| events)
    }

    /// Rewind the store until `next` attaches to its top, then replay the
    /// fetched headers. Appends the transcript to `events`.
    ///
    /// Callers must hold `step`.
    async fn build_canonical_chain(
        &self,
        next: MiniHeader,
        events: &mut Vec<BlockEvent>,
    ) -> Result<(), WatchError> {
        let mut attach_hash = next.parent_hash;
        let mut pending = vec![next];

        while let Some(top) = self.store.peek() {
            if attach_hash == top.hash {
                break;
            }
            self.store.pop();
            tracing::warn!(
                number = top.number,
                hash = %top.hash,
                depth = pending.len(),
                "Reorg detected, removing block"
            );
            events.push(BlockEvent::removed(top));

            match self.client.header_by_hash(attach_hash).await {
                Ok(parent) => {
                    attach_hash = parent.parent_hash;
                    pending.push(parent);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        hash = %attach_hash,
                        "Ancestor not found, retrying next tick"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        while let Some(mut header) = pending.pop() {
            if self.config.with_logs {
                let filter =
                    LogFilter::at_block(header.hash).with_topics(self.config.topics.iter().copied());
                header.logs = self.client.filter_logs(&filter).await?;
            }
            self.store.push(header.clone())?;
            tracing::info!(
                number = header.number,
                hash = %header.hash,
                logs = header.logs.len(),
                "Block added"
            );
            events.push(BlockEvent::added(header));
        }
        Ok(())
    }
}
