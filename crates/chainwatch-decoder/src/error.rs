//! Error types for log decoding.

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Errors that can occur while decoding a single log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The emitting contract is not registered under any family.
    #[error("unsupported source: {address} is not a registered contract")]
    UnsupportedSource { address: Address },

    /// The log has no topics, so it carries no event selector.
    #[error("log has no event selector")]
    MissingSelector,

    /// `topics[0]` is not an event of the routed contract family.
    #[error("unknown event selector {selector}")]
    UnknownEventSelector { selector: B256 },

    /// The number of indexed topics differs from the schema.
    #[error("{event}: expected {expected} indexed topics, got {actual}")]
    TopicArityMismatch {
        event: String,
        expected: usize,
        actual: usize,
    },

    /// The data payload does not match the schema's non-indexed arguments.
    #[error("{event}: payload decode failed: {reason}")]
    PayloadDecodeFailure { event: String, reason: String },

    /// An embedded ABI could not be parsed.
    #[error("ABI schema parse error: {0}")]
    SchemaParse(String),
}

impl DecodeError {
    /// Returns `true` when the log simply is not ours to decode, as opposed to
    /// a log from a known contract that failed to decode.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSource { .. } | Self::MissingSelector | Self::UnknownEventSelector { .. }
        )
    }
}
