//! End-to-end block watcher scenarios against a scripted chain.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use chainwatch_core::testing::{block_hash, build_chain, fork_chain, ChainSnapshot, FakeChainClient};
use chainwatch_core::{
    BlockEvent, BlockWatcher, ClientError, EventKind, MiniHeader, StartBlock, WatcherConfig,
};
use tokio::sync::mpsc;

type Watcher = BlockWatcher<Arc<FakeChainClient>>;

fn config(retention: usize) -> WatcherConfig {
    WatcherConfig::builder()
        .retention_limit(retention)
        .with_logs(false)
        .polling_interval(Duration::from_millis(100))
        .build()
}

fn setup(
    snapshots: Vec<ChainSnapshot>,
    config: WatcherConfig,
) -> (Arc<FakeChainClient>, Watcher, mpsc::Receiver<Vec<BlockEvent>>) {
    let client = Arc::new(FakeChainClient::new(snapshots));
    let watcher = BlockWatcher::new(Arc::clone(&client), config);
    let (tx, rx) = mpsc::channel(16);
    // Registration lives as long as the watcher.
    let _subscription = watcher.subscribe(tx);
    (client, watcher, rx)
}

fn added(h: &MiniHeader) -> BlockEvent {
    BlockEvent::added(h.clone())
}

fn removed(h: &MiniHeader) -> BlockEvent {
    BlockEvent::removed(h.clone())
}

/// Main branch, blocks 100..=103.
fn main_chain() -> Vec<MiniHeader> {
    build_chain(100, 103, 0, block_hash(99, 0))
}

// ─── S1 – S6 ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn s1_cold_start_at_latest() {
    let main = main_chain();
    let (_client, watcher, mut rx) = setup(vec![ChainSnapshot::new(main[..1].to_vec())], config(20));

    let events = watcher.poll_next_block().await.unwrap();

    assert_eq!(events, vec![added(&main[0])]);
    assert_eq!(watcher.retained_headers(), vec![main[0].clone()]);
    assert_eq!(rx.recv().await.unwrap(), vec![added(&main[0])]);
}

#[tokio::test]
async fn s2_simple_extension() {
    let main = main_chain();
    let (client, watcher, mut rx) = setup(
        vec![
            ChainSnapshot::new(main[..1].to_vec()),
            ChainSnapshot::new(main[..2].to_vec()),
        ],
        config(20),
    );
    watcher.poll_next_block().await.unwrap();
    rx.recv().await.unwrap();
    client.advance();

    let events = watcher.poll_next_block().await.unwrap();

    assert_eq!(events, vec![added(&main[1])]);
    assert_eq!(watcher.retained_headers(), main[..2].to_vec());
    assert_eq!(rx.recv().await.unwrap(), vec![added(&main[1])]);
}

#[tokio::test]
async fn s3_no_new_block_yet() {
    let main = main_chain();
    let (_client, watcher, mut rx) = setup(vec![ChainSnapshot::new(main[..1].to_vec())], config(20));
    watcher.poll_next_block().await.unwrap();
    rx.recv().await.unwrap();

    let events = watcher.poll_next_block().await.unwrap();

    assert!(events.is_empty());
    assert_eq!(watcher.retained_headers(), vec![main[0].clone()]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn s4_depth_one_reorg() {
    let main = main_chain();
    let fork = fork_chain(&main, 101, 102, 1);
    let (client, watcher, mut rx) = setup(
        vec![
            ChainSnapshot::new(main[..2].to_vec()),
            ChainSnapshot::new(fork.clone()).with_orphans(main.clone()),
        ],
        WatcherConfig {
            start_block: StartBlock::Number(100),
            ..config(20)
        },
    );
    watcher.poll_next_block().await.unwrap();
    watcher.poll_next_block().await.unwrap();
    rx.recv().await.unwrap();
    rx.recv().await.unwrap();
    client.advance();

    let events = watcher.poll_next_block().await.unwrap();

    let expected = vec![removed(&main[1]), added(&fork[1]), added(&fork[2])];
    assert_eq!(events, expected);
    assert_eq!(watcher.retained_headers(), fork);
    assert_eq!(rx.recv().await.unwrap(), expected);
}

#[tokio::test]
async fn s5_missing_ancestor_aborts_walk() {
    let main = main_chain();
    let fork = fork_chain(&main, 102, 103, 1);
    let missing = block_hash(102, 1);
    let (client, watcher, mut rx) = setup(
        vec![
            ChainSnapshot::new(main[..3].to_vec()),
            ChainSnapshot::new(fork.clone()).with_missing_hash(missing),
            ChainSnapshot::new(fork.clone()),
        ],
        WatcherConfig {
            start_block: StartBlock::Number(100),
            ..config(20)
        },
    );
    for _ in 0..3 {
        watcher.poll_next_block().await.unwrap();
        rx.recv().await.unwrap();
    }

    // Node serves 103' but cannot resolve its parent 102'.
    client.advance();
    let events = watcher.poll_next_block().await.unwrap();

    assert_eq!(events, vec![removed(&main[2])]);
    assert_eq!(watcher.retained_headers(), main[..2].to_vec());
    assert_eq!(rx.recv().await.unwrap(), vec![removed(&main[2])]);

    // Ancestor becomes available: the next tick refetches from 102.
    client.advance();
    let events = watcher.poll_next_block().await.unwrap();
    assert_eq!(events, vec![added(&fork[2])]);
    let events = watcher.poll_next_block().await.unwrap();
    assert_eq!(events, vec![added(&fork[3])]);
    assert_eq!(watcher.retained_headers(), fork);
}

#[tokio::test]
async fn missing_second_ancestor_aborts_without_pushing() {
    let main = main_chain();
    let fork = fork_chain(&main, 102, 104, 1);
    let (client, watcher, mut rx) = setup(
        vec![
            ChainSnapshot::new(main.clone()),
            ChainSnapshot::new(fork.clone()).with_missing_hash(block_hash(102, 1)),
            ChainSnapshot::new(fork.clone()),
        ],
        WatcherConfig {
            start_block: StartBlock::Number(100),
            ..config(20)
        },
    );
    for _ in 0..4 {
        watcher.poll_next_block().await.unwrap();
        rx.recv().await.unwrap();
    }

    // 104' and 103' resolve, 102' does not.
    client.advance();
    let events = watcher.poll_next_block().await.unwrap();

    assert_eq!(events, vec![removed(&main[3]), removed(&main[2])]);
    assert_eq!(watcher.retained_headers(), main[..2].to_vec());
    assert_eq!(rx.recv().await.unwrap(), events);

    client.advance();
    for expected in &fork[2..] {
        let events = watcher.poll_next_block().await.unwrap();
        assert_eq!(events, vec![added(expected)]);
    }
    assert_eq!(watcher.retained_headers(), fork);
}

#[tokio::test]
async fn s6_retention_eviction_is_silent() {
    let main = main_chain();
    let (_client, watcher, mut rx) = setup(
        vec![ChainSnapshot::new(main.clone())],
        WatcherConfig {
            start_block: StartBlock::Number(100),
            ..config(3)
        },
    );
    for _ in 0..3 {
        watcher.poll_next_block().await.unwrap();
        rx.recv().await.unwrap();
    }

    let events = watcher.poll_next_block().await.unwrap();

    assert_eq!(events, vec![added(&main[3])]);
    assert_eq!(watcher.retained_headers(), main[1..].to_vec());
    assert_eq!(rx.recv().await.unwrap(), vec![added(&main[3])]);
}

// ─── Running loop ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn loop_follows_extending_chain() {
    let main = build_chain(100, 105, 0, B256::ZERO);
    let (_client, watcher, mut rx) = setup(
        vec![ChainSnapshot::new(main.clone())],
        WatcherConfig {
            start_block: StartBlock::Number(100),
            ..config(20)
        },
    );

    let mut errors = watcher.start_polling().unwrap();
    tokio::time::sleep(Duration::from_millis(950)).await;
    watcher.stop_polling().await;

    let mut numbers = Vec::new();
    while let Ok(batch) = rx.try_recv() {
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, EventKind::Added);
        numbers.push(batch[0].header.number);
    }
    assert_eq!(numbers, (100..=105).collect::<Vec<_>>());
    assert!(errors.recv().await.is_none());
    assert!(!watcher.is_running());
}

#[tokio::test(start_paused = true)]
async fn loop_survives_transient_errors() {
    let main = build_chain(100, 101, 0, B256::ZERO);
    let (client, watcher, mut rx) = setup(
        vec![
            ChainSnapshot::failing(ClientError::Timeout { ms: 5000 }),
            ChainSnapshot::new(main.clone()),
        ],
        WatcherConfig {
            start_block: StartBlock::Number(100),
            ..config(20)
        },
    );

    let mut errors = watcher.start_polling().unwrap();
    let err = errors.recv().await.unwrap();
    assert_eq!(err.to_string(), "chain client error: request timed out after 5000ms");

    client.advance();
    assert_eq!(rx.recv().await.unwrap(), vec![added(&main[0])]);
    assert_eq!(rx.recv().await.unwrap(), vec![added(&main[1])]);
    watcher.stop_polling().await;
}

#[tokio::test]
async fn unsubscribed_sink_receives_nothing() {
    let main = main_chain();
    let client = Arc::new(FakeChainClient::fixed(ChainSnapshot::new(main)));
    let watcher = BlockWatcher::new(client, config(20));
    let (tx, mut rx) = mpsc::channel(4);
    let subscription = watcher.subscribe(tx);
    subscription.unsubscribe();

    watcher.poll_next_block().await.unwrap();
    assert!(rx.recv().await.is_none());
}
