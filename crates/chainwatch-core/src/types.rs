//! Shared types for the block-tracking pipeline.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

// ─── MiniHeader ──────────────────────────────────────────────────────────────

/// A succinct block header, enough to track the canonical chain tip.
///
/// `logs` is filled in by the block watcher after the header is fetched;
/// header stores never populate it themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniHeader {
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block number.
    pub number: u64,
    /// Logs emitted in this block that matched the watcher's topic filter.
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl MiniHeader {
    /// Create a header without logs.
    pub fn new(number: u64, hash: B256, parent_hash: B256) -> Self {
        Self {
            hash,
            parent_hash,
            number,
            logs: Vec::new(),
        }
    }

    /// Returns `true` if `parent` is referenced by this header's parent hash.
    pub fn is_child_of(&self, parent: &MiniHeader) -> bool {
        self.parent_hash == parent.hash
    }

    /// Returns `true` if `parent` is the direct predecessor by number and hash.
    pub fn extends(&self, parent: &MiniHeader) -> bool {
        self.number == parent.number + 1 && self.is_child_of(parent)
    }
}

// ─── Log ─────────────────────────────────────────────────────────────────────

/// A raw EVM log as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Contract that emitted the log.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event selector for non-anonymous events.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments.
    pub data: Bytes,
    pub block_number: u64,
    pub block_hash: B256,
    #[serde(rename = "transactionHash")]
    pub tx_hash: B256,
    pub log_index: u64,
    /// Set by the node when the log was dropped by a reorg.
    #[serde(default)]
    pub removed: bool,
}

impl Log {
    /// The event selector (`topics[0]`), if any.
    pub fn selector(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

// ─── LogFilter ───────────────────────────────────────────────────────────────

/// Which blocks a [`LogFilter`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSelection {
    /// Exactly one block, identified by hash.
    Hash(B256),
    /// An inclusive range of block numbers.
    Range { from: u64, to: u64 },
}

/// Filter passed to [`ChainClient::filter_logs`](crate::client::ChainClient::filter_logs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub block: BlockSelection,
    /// Only logs from these emitters (empty = any address).
    #[serde(default)]
    pub addresses: Vec<Address>,
    /// Only logs whose `topics[0]` is one of these (empty = any event).
    #[serde(default)]
    pub topics: Vec<B256>,
}

impl LogFilter {
    /// Filter for the logs of a single block.
    pub fn at_block(hash: B256) -> Self {
        Self {
            block: BlockSelection::Hash(hash),
            addresses: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Filter for an inclusive block-number range.
    pub fn range(from: u64, to: u64) -> Self {
        Self {
            block: BlockSelection::Range { from, to },
            addresses: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Restrict to the given topic-0 values.
    pub fn with_topics(mut self, topics: impl IntoIterator<Item = B256>) -> Self {
        self.topics.extend(topics);
        self
    }

    /// Restrict to logs emitted by `address`.
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    /// Returns `true` if `log` falls inside this filter.
    pub fn matches(&self, log: &Log) -> bool {
        let in_block = match self.block {
            BlockSelection::Hash(hash) => log.block_hash == hash,
            BlockSelection::Range { from, to } => (from..=to).contains(&log.block_number),
        };
        in_block
            && (self.addresses.is_empty() || self.addresses.contains(&log.address))
            && (self.topics.is_empty()
                || log.selector().is_some_and(|t| self.topics.contains(&t)))
    }
}

// ─── BlockEvent ──────────────────────────────────────────────────────────────

/// Whether a header entered or left the canonical suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Added,
    Removed,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// One step of a reorg transcript published by the block watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvent {
    pub kind: EventKind,
    pub header: MiniHeader,
}

impl BlockEvent {
    pub fn added(header: MiniHeader) -> Self {
        Self {
            kind: EventKind::Added,
            header,
        }
    }

    pub fn removed(header: MiniHeader) -> Self {
        Self {
            kind: EventKind::Removed,
            header,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    fn log_at(block_hash: B256, number: u64, topic0: B256) -> Log {
        Log {
            address: Address::repeat_byte(0x11),
            topics: vec![topic0],
            data: Bytes::new(),
            block_number: number,
            block_hash,
            tx_hash: h(0xee),
            log_index: 0,
            removed: false,
        }
    }

    #[test]
    fn header_extends_parent() {
        let parent = MiniHeader::new(100, h(0xa), h(0x9));
        let child = MiniHeader::new(101, h(0xb), h(0xa));
        assert!(child.extends(&parent));
        assert!(child.is_child_of(&parent));
        assert!(!parent.extends(&child));
    }

    #[test]
    fn extends_false_on_number_gap() {
        let a = MiniHeader::new(100, h(0xa), h(0x9));
        let b = MiniHeader::new(102, h(0xc), h(0xa));
        assert!(b.is_child_of(&a));
        assert!(!b.extends(&a));
    }

    #[test]
    fn filter_by_block_hash_and_topic() {
        let filter = LogFilter::at_block(h(0xb)).with_topics([h(0x01)]);
        assert!(filter.matches(&log_at(h(0xb), 101, h(0x01))));
        assert!(!filter.matches(&log_at(h(0xb), 101, h(0x02))));
        assert!(!filter.matches(&log_at(h(0xc), 101, h(0x01))));
    }

    #[test]
    fn empty_topic_filter_matches_all_events() {
        let filter = LogFilter::range(100, 105);
        assert!(filter.matches(&log_at(h(0xb), 100, h(0x07))));
        assert!(filter.matches(&log_at(h(0xb), 105, h(0x08))));
        assert!(!filter.matches(&log_at(h(0xb), 106, h(0x08))));
    }

    #[test]
    fn header_json_uses_camel_case() {
        let header = MiniHeader::new(1, h(0x1), h(0x0));
        let json = serde_json::to_value(&header).unwrap();
        assert!(json.get("parentHash").is_some());
    }
}
