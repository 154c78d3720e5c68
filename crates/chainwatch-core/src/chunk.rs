//! Splitting of block-number ranges for `eth_getLogs` backfill.

/// An inclusive range of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Number of blocks covered.
    pub fn block_count(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// Split `[from, to]` into consecutive sub-ranges of at most `chunk_size`
/// blocks. The last sub-range is clamped to end at `to`.
///
/// An inverted range yields nothing; a `chunk_size` of zero is treated as one.
pub fn chunk_block_range(from: u64, to: u64, chunk_size: u64) -> Vec<BlockRange> {
    if to < from {
        return Vec::new();
    }
    let step = chunk_size.max(1);
    let mut ranges = Vec::with_capacity(((to - from) / step + 1) as usize);
    let mut start = from;
    loop {
        let end = start.saturating_add(step - 1).min(to);
        ranges.push(BlockRange::new(start, end));
        if end == to {
            break;
        }
        start = end + 1;
    }
    ranges
}
