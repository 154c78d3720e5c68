//! Event selector computation.
//!
//! The selector of a non-anonymous event is the keccak256 hash of its
//! canonical signature and is emitted as `topics[0]`:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

/// Compute the keccak256 selector of an event signature string.
pub fn keccak256_signature(signature: &str) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Parse a `0x`-prefixed (or bare) 32-byte hex selector.
pub fn parse_selector(s: &str) -> Option<B256> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(hex).ok()?;
    (bytes.len() == 32).then(|| B256::from_slice(&bytes))
}
