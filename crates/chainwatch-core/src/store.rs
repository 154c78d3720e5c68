//! Header store: a bounded LIFO of recent headers with uniqueness checks.
//!
//! Pushes and pops happen at the top (highest block number); when the
//! retention limit is reached the *oldest* entry is evicted from the bottom.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;
use crate::types::MiniHeader;

/// Storage for the block watcher's model of the canonical chain.
///
/// All methods take `&self`; implementations serialize access internally so
/// inspectors can read while the watcher task writes.
pub trait HeaderStore: Send + Sync {
    /// The top entry, if any.
    fn peek(&self) -> Option<MiniHeader>;

    /// Remove and return the top entry, if any.
    fn pop(&self) -> Option<MiniHeader>;

    /// Insert `header` at the top, evicting the oldest entry on pressure.
    ///
    /// Fails with [`StoreError::DuplicateHeader`] if an entry with the same
    /// number or hash is already stored; the store is left untouched.
    fn push(&self, header: MiniHeader) -> Result<(), StoreError>;

    /// All entries ordered by ascending block number.
    fn peek_all(&self) -> Vec<MiniHeader>;

    /// Remove every entry.
    fn clear(&self);

    /// Number of stored entries.
    fn len(&self) -> usize {
        self.peek_all().len()
    }

    fn is_empty(&self) -> bool {
        self.peek().is_none()
    }
}

// ─── MemoryHeaderStore ───────────────────────────────────────────────────────

struct Inner {
    /// Oldest first.
    headers: VecDeque<MiniHeader>,
    checkpoint: Option<(u64, VecDeque<MiniHeader>)>,
    next_checkpoint_id: u64,
}

/// In-memory [`HeaderStore`] backed by a `VecDeque` under a mutex.
pub struct MemoryHeaderStore {
    inner: Mutex<Inner>,
    retention_limit: usize,
}

impl MemoryHeaderStore {
    /// Create a store holding at most `retention_limit` headers (minimum 1).
    pub fn new(retention_limit: usize) -> Self {
        let retention_limit = retention_limit.max(1);
        Self {
            inner: Mutex::new(Inner {
                headers: VecDeque::with_capacity(retention_limit),
                checkpoint: None,
                next_checkpoint_id: 1,
            }),
            retention_limit,
        }
    }

    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Snapshot the current contents and return the checkpoint id.
    ///
    /// Only the most recent checkpoint can be restored; taking a new one
    /// invalidates the previous id.
    pub fn checkpoint(&self) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_checkpoint_id;
        inner.next_checkpoint_id += 1;
        inner.checkpoint = Some((id, inner.headers.clone()));
        id
    }

    /// Restore the contents captured by checkpoint `id`.
    pub fn reset(&self, id: u64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let snapshot = match &inner.checkpoint {
            Some((current, snapshot)) if *current == id => snapshot.clone(),
            _ => return Err(StoreError::UnknownCheckpoint { id }),
        };
        tracing::debug!(checkpoint = id, entries = snapshot.len(), "header store reset");
        inner.headers = snapshot;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HeaderStore for MemoryHeaderStore {
    fn peek(&self) -> Option<MiniHeader> {
        self.lock().headers.back().cloned()
    }

    fn pop(&self) -> Option<MiniHeader> {
        self.lock().headers.pop_back()
    }

    fn push(&self, header: MiniHeader) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner
            .headers
            .iter()
            .any(|h| h.number == header.number || h.hash == header.hash)
        {
            return Err(StoreError::DuplicateHeader {
                number: header.number,
                hash: header.hash,
            });
        }
        while inner.headers.len() >= self.retention_limit {
            inner.headers.pop_front();
        }
        // Keep ascending order even if a caller pushes below the top.
        let pos = inner
            .headers
            .iter()
            .rposition(|h| h.number < header.number)
            .map_or(0, |i| i + 1);
        inner.headers.insert(pos, header);
        Ok(())
    }

    fn peek_all(&self) -> Vec<MiniHeader> {
        self.lock().headers.iter().cloned().collect()
    }

    fn clear(&self) {
        self.lock().headers.clear();
    }

    fn len(&self) -> usize {
        self.lock().headers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn header(number: u64) -> MiniHeader {
        MiniHeader::new(
            number,
            B256::with_last_byte(number as u8),
            B256::with_last_byte(number.wrapping_sub(1) as u8),
        )
    }

    #[test]
    fn empty_store() {
        let store = MemoryHeaderStore::new(5);
        assert!(store.peek().is_none());
        assert!(store.pop().is_none());
        assert!(store.peek_all().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn push_peek_pop_lifo() {
        let store = MemoryHeaderStore::new(5);
        store.push(header(1)).unwrap();
        store.push(header(2)).unwrap();
        assert_eq!(store.peek().unwrap().number, 2);
        assert_eq!(store.pop().unwrap().number, 2);
        assert_eq!(store.pop().unwrap().number, 1);
        assert!(store.pop().is_none());
    }

    #[test]
    fn duplicate_number_rejected() {
        let store = MemoryHeaderStore::new(5);
        store.push(header(1)).unwrap();
        let mut dup = header(1);
        dup.hash = B256::repeat_byte(0xff);
        let err = store.push(dup).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHeader { number: 1, .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_hash_rejected() {
        let store = MemoryHeaderStore::new(5);
        store.push(header(1)).unwrap();
        let mut dup = header(9);
        dup.hash = header(1).hash;
        assert!(store.push(dup).is_err());
        assert_eq!(store.peek_all(), vec![header(1)]);
    }

    #[test]
    fn retention_evicts_oldest() {
        let store = MemoryHeaderStore::new(3);
        for n in 1..=4 {
            store.push(header(n)).unwrap();
        }
        let numbers: Vec<u64> = store.peek_all().iter().map(|h| h.number).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
    }

    #[test]
    fn clear_empties_store() {
        let store = MemoryHeaderStore::new(3);
        store.push(header(1)).unwrap();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn zero_retention_clamped_to_one() {
        let store = MemoryHeaderStore::new(0);
        store.push(header(1)).unwrap();
        store.push(header(2)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.retention_limit(), 1);
    }

    #[test]
    fn checkpoint_and_reset() {
        let store = MemoryHeaderStore::new(5);
        store.push(header(1)).unwrap();
        let id = store.checkpoint();
        store.push(header(2)).unwrap();
        store.pop();
        store.pop();
        store.reset(id).unwrap();
        assert_eq!(store.peek_all(), vec![header(1)]);
    }

    #[test]
    fn stale_checkpoint_rejected() {
        let store = MemoryHeaderStore::new(5);
        let old = store.checkpoint();
        let new = store.checkpoint();
        assert_ne!(old, new);
        assert_eq!(
            store.reset(old),
            Err(StoreError::UnknownCheckpoint { id: old })
        );
        assert!(store.reset(new).is_ok());
        assert!(store.reset(42).is_err());
    }
}
