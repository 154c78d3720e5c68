//! Property tests for the header store: retention, uniqueness and LIFO order.

use alloy_primitives::B256;
use chainwatch_core::{HeaderStore, MemoryHeaderStore, MiniHeader, StoreError};
use proptest::{prelude::*, test_runner::Config};

#[derive(Debug, Clone)]
enum Op {
    Push { number: u64, hash: u8 },
    Pop,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u64..24, 0u8..24).prop_map(|(number, hash)| Op::Push { number, hash }),
        2 => Just(Op::Pop),
        1 => Just(Op::Clear),
    ]
}

fn header(number: u64, hash: u8) -> MiniHeader {
    MiniHeader::new(number, B256::repeat_byte(hash), B256::ZERO)
}

fn numbers(store: &MemoryHeaderStore) -> Vec<u64> {
    store.peek_all().iter().map(|h| h.number).collect()
}

proptest! {
    #![proptest_config(Config {
        failure_persistence: None,
        ..Config::default()
    })]

    #[test]
    fn retention_and_uniqueness_hold(
        limit in 1usize..8,
        ops in proptest::collection::vec(op_strategy(), 0..64),
    ) {
        let store = MemoryHeaderStore::new(limit);
        for op in ops {
            match op {
                Op::Push { number, hash } => {
                    let before = store.peek_all();
                    let h = header(number, hash);
                    let collides = before
                        .iter()
                        .any(|e| e.number == h.number || e.hash == h.hash);
                    let result = store.push(h);
                    if collides {
                        let is_duplicate = matches!(result, Err(StoreError::DuplicateHeader { .. }));
                        prop_assert!(is_duplicate);
                        prop_assert_eq!(store.peek_all(), before);
                    } else {
                        prop_assert!(result.is_ok());
                    }
                }
                Op::Pop => {
                    let top = store.peek();
                    prop_assert_eq!(store.pop(), top);
                }
                Op::Clear => {
                    store.clear();
                    prop_assert!(store.peek_all().is_empty());
                }
            }
            prop_assert!(store.peek_all().len() <= limit);
            let nums = numbers(&store);
            prop_assert!(nums.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn pops_mirror_pushes(start in 0u64..1_000_000, count in 0usize..16) {
        let store = MemoryHeaderStore::new(16);
        let pushed: Vec<MiniHeader> = (0..count as u64)
            .map(|i| header(start + i, i as u8))
            .collect();
        for h in &pushed {
            store.push(h.clone()).unwrap();
        }
        for h in pushed.iter().rev() {
            let peeked = store.peek();
            prop_assert_eq!(peeked.as_ref(), Some(h));
            let popped = store.pop();
            prop_assert_eq!(popped.as_ref(), Some(h));
        }
        prop_assert!(store.pop().is_none());
    }

    #[test]
    fn eviction_removes_strict_minimum(limit in 1usize..6, extra in 1usize..10) {
        let store = MemoryHeaderStore::new(limit);
        for i in 0..(limit + extra) as u64 {
            let before = numbers(&store);
            store.push(header(i, i as u8)).unwrap();
            let after = numbers(&store);
            if before.len() == limit {
                let min = *before.iter().min().unwrap();
                prop_assert!(!after.contains(&min));
                prop_assert_eq!(&after[..limit - 1], &before[1..]);
            }
            prop_assert_eq!(after.last().copied(), Some(i));
        }
    }
}
