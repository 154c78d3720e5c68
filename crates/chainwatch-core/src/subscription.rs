//! Subscriber registry for block-event batches.
//!
//! Each subscriber owns a bounded `mpsc` channel. Publication awaits every
//! sink in registration order, so a slow subscriber stalls the watcher
//! instead of losing events. Closed sinks are pruned on the next publish.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::types::BlockEvent;

/// Sending half of a subscriber's sink.
pub type EventSink = mpsc::Sender<Vec<BlockEvent>>;

/// Identifier handed out for every registered sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    sinks: Mutex<BTreeMap<SubscriptionId, EventSink>>,
    next_id: AtomicU64,
}

/// The set of sinks a watcher publishes to.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    registry: Arc<Registry>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink`; it receives every batch published from now on.
    pub fn subscribe(&self, sink: EventSink) -> Subscription {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks().insert(id, sink);
        tracing::debug!(subscription = %id, "subscriber registered");
        Subscription {
            id,
            set: self.clone(),
        }
    }

    /// Remove a sink. Unknown ids are ignored.
    pub fn remove(&self, id: SubscriptionId) {
        if self.sinks().remove(&id).is_some() {
            tracing::debug!(subscription = %id, "subscriber removed");
        }
    }

    /// Deliver `batch` to every sink, in registration order.
    ///
    /// Waits for capacity on each sink. A sink removed while an earlier sink
    /// is still being awaited is skipped. Sinks whose receiver has been
    /// dropped are removed. Returns the number of sinks that accepted the batch.
    pub async fn publish(&self, batch: &[BlockEvent]) -> usize {
        let targets: Vec<(SubscriptionId, EventSink)> = self
            .sinks()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        for (id, tx) in targets {
            if !self.sinks().contains_key(&id) {
                continue;
            }
            if tx.send(batch.to_vec()).await.is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(subscription = %id, "subscriber closed, pruning");
                self.remove(id);
            }
        }
        delivered
    }

    /// Number of registered sinks.
    pub fn len(&self) -> usize {
        self.sinks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sinks(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, EventSink>> {
        self.registry
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`SubscriberSet::subscribe`].
///
/// Dropping the handle keeps the sink registered; call [`unsubscribe`](Self::unsubscribe)
/// or drop the receiver to stop delivery.
pub struct Subscription {
    id: SubscriptionId,
    set: SubscriberSet,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop delivering batches to this sink.
    ///
    /// A publish already waiting on this sink's capacity still delivers its
    /// batch; later sends, including the rest of an in-flight publish, skip it.
    pub fn unsubscribe(self) {
        self.set.remove(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MiniHeader;
    use alloy_primitives::B256;

    fn batch(n: u64) -> Vec<BlockEvent> {
        vec![BlockEvent::added(MiniHeader::new(
            n,
            B256::with_last_byte(n as u8),
            B256::ZERO,
        ))]
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let set = SubscriberSet::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let _a = set.subscribe(tx_a);
        let _b = set.subscribe(tx_b);

        assert_eq!(set.publish(&batch(1)).await, 2);
        assert_eq!(rx_a.recv().await.unwrap(), batch(1));
        assert_eq!(rx_b.recv().await.unwrap(), batch(1));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let set = SubscriberSet::new();
        let (tx, mut rx) = mpsc::channel(4);
        let sub = set.subscribe(tx);
        sub.unsubscribe();
        assert_eq!(set.publish(&batch(1)).await, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_receiver_is_pruned() {
        let set = SubscriberSet::new();
        let (tx, rx) = mpsc::channel(1);
        let _sub = set.subscribe(tx);
        drop(rx);
        assert_eq!(set.publish(&batch(1)).await, 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn batches_arrive_in_publish_order() {
        let set = SubscriberSet::new();
        let (tx, mut rx) = mpsc::channel(8);
        let _sub = set.subscribe(tx);
        for n in 1..=3 {
            set.publish(&batch(n)).await;
        }
        for n in 1..=3 {
            assert_eq!(rx.recv().await.unwrap(), batch(n));
        }
    }

    #[tokio::test]
    async fn slow_subscriber_blocks_until_drained() {
        let set = SubscriberSet::new();
        let (tx, mut rx) = mpsc::channel(1);
        let _sub = set.subscribe(tx);
        set.publish(&batch(1)).await;

        let publisher = {
            let set = set.clone();
            tokio::spawn(async move { set.publish(&batch(2)).await })
        };
        tokio::task::yield_now().await;
        assert!(!publisher.is_finished());

        assert_eq!(rx.recv().await.unwrap(), batch(1));
        assert_eq!(publisher.await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), batch(2));
    }

    #[tokio::test]
    async fn unsubscribe_during_publish_skips_pending_sink() {
        let set = SubscriberSet::new();
        let (tx_slow, mut rx_slow) = mpsc::channel(1);
        let (tx_late, mut rx_late) = mpsc::channel(4);
        let _slow = set.subscribe(tx_slow);
        let late = set.subscribe(tx_late);
        set.publish(&batch(1)).await;
        assert_eq!(rx_late.recv().await.unwrap(), batch(1));

        let publisher = {
            let set = set.clone();
            tokio::spawn(async move { set.publish(&batch(2)).await })
        };
        tokio::task::yield_now().await;
        assert!(!publisher.is_finished());

        late.unsubscribe();
        assert_eq!(rx_slow.recv().await.unwrap(), batch(1));
        assert_eq!(publisher.await.unwrap(), 1);
        assert_eq!(rx_slow.recv().await.unwrap(), batch(2));
        assert!(rx_late.recv().await.is_none());
    }
}
