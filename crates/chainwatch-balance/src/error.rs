//! Balance watcher errors.

use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    /// The address is not in the watched set.
    #[error("address {0} is not tracked")]
    NotTracked(Address),

    #[error("balance watcher is already running")]
    AlreadyRunning,
}

impl BalanceError {
    pub fn is_not_tracked(&self) -> bool {
        matches!(self, Self::NotTracked(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_tracked_message_names_address() {
        let err = BalanceError::NotTracked(Address::repeat_byte(0x11));
        assert!(err.is_not_tracked());
        assert!(err.to_string().contains("0x1111"));
    }
}
