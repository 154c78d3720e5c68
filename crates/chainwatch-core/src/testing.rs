//! Scripted chain client for tests.
//!
//! A [`FakeChainClient`] replays a list of [`ChainSnapshot`]s. Every RPC
//! answers from the current snapshot; [`FakeChainClient::advance`] moves the
//! timeline forward, typically once per watcher tick.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;

use crate::client::ChainClient;
use crate::error::ClientError;
use crate::types::{Log, LogFilter, MiniHeader};

/// The chain as seen by the node at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ChainSnapshot {
    /// Canonical chain ordered by number; the last entry is `latest`.
    pub canonical: Vec<MiniHeader>,
    /// Headers known by hash but no longer canonical.
    pub orphans: Vec<MiniHeader>,
    /// Logs served by `filter_logs`.
    pub logs: Vec<Log>,
    /// Hashes `header_by_hash` pretends not to know.
    pub missing_hashes: Vec<B256>,
    /// When set, every call fails with this error.
    pub failure: Option<ClientError>,
}

impl ChainSnapshot {
    pub fn new(canonical: Vec<MiniHeader>) -> Self {
        Self {
            canonical,
            ..Self::default()
        }
    }

    pub fn with_orphans(mut self, orphans: Vec<MiniHeader>) -> Self {
        self.orphans = orphans;
        self
    }

    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_missing_hash(mut self, hash: B256) -> Self {
        self.missing_hashes.push(hash);
        self
    }

    /// A snapshot whose every call fails with `err`.
    pub fn failing(err: ClientError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }
}

/// One recorded call against a [`FakeChainClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    HeaderByNumber(Option<u64>),
    HeaderByHash(B256),
    FilterLogs(LogFilter),
}

struct State {
    snapshots: Vec<ChainSnapshot>,
    cursor: usize,
    calls: Vec<ClientCall>,
    latency: Duration,
}

/// A [`ChainClient`] that answers from a scripted timeline.
pub struct FakeChainClient {
    state: Mutex<State>,
}

impl FakeChainClient {
    /// Create a client that starts at the first of `snapshots`.
    pub fn new(snapshots: Vec<ChainSnapshot>) -> Self {
        Self {
            state: Mutex::new(State {
                snapshots,
                cursor: 0,
                calls: Vec::new(),
                latency: Duration::ZERO,
            }),
        }
    }

    /// A client with a single, static snapshot.
    pub fn fixed(snapshot: ChainSnapshot) -> Self {
        Self::new(vec![snapshot])
    }

    /// Move to the next snapshot. Returns `false` once the last snapshot is
    /// reached; the client then keeps answering from it.
    pub fn advance(&self) -> bool {
        let mut state = self.lock();
        if state.cursor + 1 < state.snapshots.len() {
            state.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Append a snapshot to the end of the timeline.
    pub fn push_snapshot(&self, snapshot: ChainSnapshot) {
        self.lock().snapshots.push(snapshot);
    }

    /// Index of the current snapshot.
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Sleep for `latency` before answering every header lookup.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` and run `f` against the current snapshot.
    fn answer<T>(
        &self,
        call: ClientCall,
        f: impl FnOnce(&ChainSnapshot) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut state = self.lock();
        state.calls.push(call);
        let Some(snapshot) = state.snapshots.get(state.cursor) else {
            return Err(ClientError::NotFound);
        };
        if let Some(err) = &snapshot.failure {
            return Err(err.clone());
        }
        f(snapshot)
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn header_by_number(&self, number: Option<u64>) -> Result<MiniHeader, ClientError> {
        self.delay().await;
        self.answer(ClientCall::HeaderByNumber(number), |snap| {
            let found = match number {
                None => snap.canonical.last(),
                Some(n) => snap.canonical.iter().find(|h| h.number == n),
            };
            found.cloned().ok_or(ClientError::NotFound)
        })
    }

    async fn header_by_hash(&self, hash: B256) -> Result<MiniHeader, ClientError> {
        self.delay().await;
        self.answer(ClientCall::HeaderByHash(hash), |snap| {
            if snap.missing_hashes.contains(&hash) {
                return Err(ClientError::NotFound);
            }
            snap.canonical
                .iter()
                .chain(snap.orphans.iter())
                .find(|h| h.hash == hash)
                .cloned()
                .ok_or(ClientError::NotFound)
        })
    }

    async fn filter_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ClientError> {
        self.answer(ClientCall::FilterLogs(filter.clone()), |snap| {
            Ok(snap
                .logs
                .iter()
                .filter(|log| filter.matches(log))
                .cloned()
                .collect())
        })
    }
}

// ─── Chain fixtures ──────────────────────────────────────────────────────────

/// Deterministic hash for block `number` on `branch`.
pub fn block_hash(number: u64, branch: u8) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0] = branch.wrapping_add(1);
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

/// A parent-chained run of headers `from..=to` on `branch`, the first one
/// pointing at `first_parent`.
pub fn build_chain(from: u64, to: u64, branch: u8, first_parent: B256) -> Vec<MiniHeader> {
    let mut parent = first_parent;
    (from..=to)
        .map(|number| {
            let header = MiniHeader::new(number, block_hash(number, branch), parent);
            parent = header.hash;
            header
        })
        .collect()
}

/// `base` up to (excluding) `fork_at`, followed by a new branch up to `to`.
pub fn fork_chain(base: &[MiniHeader], fork_at: u64, to: u64, branch: u8) -> Vec<MiniHeader> {
    let mut chain: Vec<MiniHeader> = base
        .iter()
        .take_while(|h| h.number < fork_at)
        .cloned()
        .collect();
    let parent = chain.last().map_or(B256::ZERO, |h| h.hash);
    chain.extend(build_chain(fork_at, to, branch, parent));
    chain
}
