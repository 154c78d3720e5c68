//! chainwatch-decoder: turns raw EVM logs from known contracts into typed
//! ERC20, ERC721 and exchange events.
//!
//! # Pipeline
//!
//! ```text
//! Log ─▶ route by address (erc20 → erc721 → exchange)
//!     ─▶ schema lookup by topics[0]
//!     ─▶ indexed args from topics[1..], the rest from data (ABI tuple)
//!     ─▶ ContractEvent
//! ```

pub mod abi;
pub mod decoder;
pub mod error;
pub mod events;
pub mod selector;

pub use abi::{ContractFamily, EventParam, EventSchema, SchemaTable};
pub use decoder::LogDecoder;
pub use error::DecodeError;
pub use events::{
    ContractEvent, DecodedArgs, Erc20ApprovalEvent, Erc20TransferEvent, Erc721ApprovalEvent,
    Erc721ApprovalForAllEvent, Erc721TransferEvent, ExchangeCancelEvent, ExchangeCancelUpToEvent,
    ExchangeFillEvent, WethDepositEvent, WethWithdrawalEvent,
};
pub use selector::keccak256_signature;
