//! Property tests for the block watcher: monotonic extension and reorg symmetry.

use std::sync::Arc;

use alloy_primitives::B256;
use chainwatch_core::testing::{build_chain, fork_chain, ChainSnapshot, FakeChainClient};
use chainwatch_core::{BlockEvent, BlockWatcher, EventKind, StartBlock, WatcherConfig};
use proptest::{prelude::*, test_runner::Config};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn config(start: u64, retention: usize) -> WatcherConfig {
    WatcherConfig::builder()
        .start_block(StartBlock::Number(start))
        .retention_limit(retention)
        .with_logs(false)
        .build()
}

proptest! {
    #![proptest_config(Config {
        cases: 64,
        failure_persistence: None,
        ..Config::default()
    })]

    #[test]
    fn extending_chain_yields_monotonic_added_events(
        start in 0u64..1_000_000,
        len in 1u64..30,
        retention in 1usize..10,
        extra_polls in 0usize..4,
    ) {
        let chain = build_chain(start, start + len - 1, 0, B256::ZERO);
        let client = Arc::new(FakeChainClient::fixed(ChainSnapshot::new(chain.clone())));
        let watcher = BlockWatcher::new(client, config(start, retention));

        let events: Vec<BlockEvent> = runtime().block_on(async {
            let mut all = Vec::new();
            for _ in 0..len as usize + extra_polls {
                all.extend(watcher.poll_next_block().await.unwrap());
            }
            all
        });

        prop_assert!(events.iter().all(|e| e.kind == EventKind::Added));
        prop_assert_eq!(events.len() as u64, len);
        for pair in events.windows(2) {
            prop_assert!(pair[1].header.extends(&pair[0].header));
        }
        let retained = watcher.retained_headers();
        prop_assert_eq!(retained.len(), retention.min(len as usize));
        prop_assert_eq!(&retained[..], &chain[chain.len() - retained.len()..]);
    }

    #[test]
    fn reorg_transcript_is_symmetric(len in 2u64..12, depth_seed in 0u64..100) {
        let depth = 1 + depth_seed % (len - 1);
        let first = 100;
        let tip = first + len - 1;
        let main = build_chain(first, tip, 0, B256::ZERO);
        let fork = fork_chain(&main, tip - depth + 1, tip + 1, 1);

        let client = Arc::new(FakeChainClient::new(vec![
            ChainSnapshot::new(main.clone()),
            ChainSnapshot::new(fork.clone()).with_orphans(main.clone()),
        ]));
        let watcher = BlockWatcher::new(Arc::clone(&client), config(first, 32));

        let transcript = runtime().block_on(async {
            for _ in 0..len {
                watcher.poll_next_block().await.unwrap();
            }
            client.advance();
            watcher.poll_next_block().await.unwrap()
        });

        let d = depth as usize;
        prop_assert_eq!(transcript.len(), 2 * d + 1);
        let (removed, added) = transcript.split_at(d);
        prop_assert!(removed.iter().all(|e| e.kind == EventKind::Removed));
        prop_assert!(added.iter().all(|e| e.kind == EventKind::Added));

        let removed_numbers: Vec<u64> = removed.iter().map(|e| e.header.number).collect();
        let expected_removed: Vec<u64> = (tip - depth + 1..=tip).rev().collect();
        prop_assert_eq!(removed_numbers, expected_removed);

        let added_headers: Vec<_> = added.iter().map(|e| e.header.clone()).collect();
        prop_assert_eq!(&added_headers[..], &fork[fork.len() - d - 1..]);
        prop_assert_eq!(watcher.retained_headers(), fork);
    }
}
