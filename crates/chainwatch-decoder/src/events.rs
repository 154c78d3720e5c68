//! Typed domain events produced by the decoder.

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::abi::ContractFamily;
use crate::error::DecodeError;

// ─── ERC20 ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20ApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
}

/// Wrapped-ether deposit (native token in, wrapped token minted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WethDepositEvent {
    pub owner: Address,
    pub value: U256,
}

/// Wrapped-ether withdrawal (wrapped token burned, native token out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WethWithdrawalEvent {
    pub owner: Address,
    pub value: U256,
}

// ─── ERC721 ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721TransferEvent {
    pub from: Address,
    pub to: Address,
    pub token_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721ApprovalEvent {
    pub owner: Address,
    pub approved: Address,
    pub token_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721ApprovalForAllEvent {
    pub owner: Address,
    pub operator: Address,
    pub approved: bool,
}

// ─── Exchange ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeFillEvent {
    pub maker_address: Address,
    pub fee_recipient_address: Address,
    pub taker_address: Address,
    pub sender_address: Address,
    pub maker_asset_filled_amount: U256,
    pub taker_asset_filled_amount: U256,
    pub maker_fee_paid: U256,
    pub taker_fee_paid: U256,
    pub order_hash: B256,
    pub maker_asset_data: Bytes,
    pub taker_asset_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCancelEvent {
    pub maker_address: Address,
    pub fee_recipient_address: Address,
    pub sender_address: Address,
    pub order_hash: B256,
    pub maker_asset_data: Bytes,
    pub taker_asset_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCancelUpToEvent {
    pub maker_address: Address,
    pub sender_address: Address,
    pub order_epoch: U256,
}

// ─── ContractEvent ───────────────────────────────────────────────────────────

/// A decoded log from any supported contract family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameters")]
pub enum ContractEvent {
    #[serde(rename = "ERC20TransferEvent")]
    Erc20Transfer(Erc20TransferEvent),
    #[serde(rename = "ERC20ApprovalEvent")]
    Erc20Approval(Erc20ApprovalEvent),
    #[serde(rename = "WethDepositEvent")]
    WethDeposit(WethDepositEvent),
    #[serde(rename = "WethWithdrawalEvent")]
    WethWithdrawal(WethWithdrawalEvent),
    #[serde(rename = "ERC721TransferEvent")]
    Erc721Transfer(Erc721TransferEvent),
    #[serde(rename = "ERC721ApprovalEvent")]
    Erc721Approval(Erc721ApprovalEvent),
    #[serde(rename = "ERC721ApprovalForAllEvent")]
    Erc721ApprovalForAll(Erc721ApprovalForAllEvent),
    #[serde(rename = "ExchangeFillEvent")]
    ExchangeFill(ExchangeFillEvent),
    #[serde(rename = "ExchangeCancelEvent")]
    ExchangeCancel(ExchangeCancelEvent),
    #[serde(rename = "ExchangeCancelUpToEvent")]
    ExchangeCancelUpTo(ExchangeCancelUpToEvent),
}

impl ContractEvent {
    /// Stable name of the event kind, as used in logs and serialized output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Erc20Transfer(_) => "ERC20TransferEvent",
            Self::Erc20Approval(_) => "ERC20ApprovalEvent",
            Self::WethDeposit(_) => "WethDepositEvent",
            Self::WethWithdrawal(_) => "WethWithdrawalEvent",
            Self::Erc721Transfer(_) => "ERC721TransferEvent",
            Self::Erc721Approval(_) => "ERC721ApprovalEvent",
            Self::Erc721ApprovalForAll(_) => "ERC721ApprovalForAllEvent",
            Self::ExchangeFill(_) => "ExchangeFillEvent",
            Self::ExchangeCancel(_) => "ExchangeCancelEvent",
            Self::ExchangeCancelUpTo(_) => "ExchangeCancelUpToEvent",
        }
    }

    pub fn family(&self) -> ContractFamily {
        match self {
            Self::Erc20Transfer(_)
            | Self::Erc20Approval(_)
            | Self::WethDeposit(_)
            | Self::WethWithdrawal(_) => ContractFamily::Erc20,
            Self::Erc721Transfer(_) | Self::Erc721Approval(_) | Self::Erc721ApprovalForAll(_) => {
                ContractFamily::Erc721
            }
            Self::ExchangeFill(_) | Self::ExchangeCancel(_) | Self::ExchangeCancelUpTo(_) => {
                ContractFamily::Exchange
            }
        }
    }

    /// Assemble a typed event from decoded arguments.
    pub(crate) fn from_args(
        family: ContractFamily,
        event: &str,
        args: &DecodedArgs,
    ) -> Result<Self, DecodeError> {
        let ev = match (family, event) {
            (ContractFamily::Erc20, "Transfer") => Self::Erc20Transfer(Erc20TransferEvent {
                from: args.address("from")?,
                to: args.address("to")?,
                value: args.uint("value")?,
            }),
            (ContractFamily::Erc20, "Approval") => Self::Erc20Approval(Erc20ApprovalEvent {
                owner: args.address("owner")?,
                spender: args.address("spender")?,
                value: args.uint("value")?,
            }),
            (ContractFamily::Erc20, "Deposit") => Self::WethDeposit(WethDepositEvent {
                owner: args.address("owner")?,
                value: args.uint("value")?,
            }),
            (ContractFamily::Erc20, "Withdrawal") => Self::WethWithdrawal(WethWithdrawalEvent {
                owner: args.address("owner")?,
                value: args.uint("value")?,
            }),
            (ContractFamily::Erc721, "Transfer") => Self::Erc721Transfer(Erc721TransferEvent {
                from: args.address("from")?,
                to: args.address("to")?,
                token_id: args.uint("tokenId")?,
            }),
            (ContractFamily::Erc721, "Approval") => Self::Erc721Approval(Erc721ApprovalEvent {
                owner: args.address("owner")?,
                approved: args.address("approved")?,
                token_id: args.uint("tokenId")?,
            }),
            (ContractFamily::Erc721, "ApprovalForAll") => {
                Self::Erc721ApprovalForAll(Erc721ApprovalForAllEvent {
                    owner: args.address("owner")?,
                    operator: args.address("operator")?,
                    approved: args.bool("approved")?,
                })
            }
            (ContractFamily::Exchange, "Fill") => Self::ExchangeFill(ExchangeFillEvent {
                maker_address: args.address("makerAddress")?,
                fee_recipient_address: args.address("feeRecipientAddress")?,
                taker_address: args.address("takerAddress")?,
                sender_address: args.address("senderAddress")?,
                maker_asset_filled_amount: args.uint("makerAssetFilledAmount")?,
                taker_asset_filled_amount: args.uint("takerAssetFilledAmount")?,
                maker_fee_paid: args.uint("makerFeePaid")?,
                taker_fee_paid: args.uint("takerFeePaid")?,
                order_hash: args.word("orderHash")?,
                maker_asset_data: args.bytes("makerAssetData")?,
                taker_asset_data: args.bytes("takerAssetData")?,
            }),
            (ContractFamily::Exchange, "Cancel") => Self::ExchangeCancel(ExchangeCancelEvent {
                maker_address: args.address("makerAddress")?,
                fee_recipient_address: args.address("feeRecipientAddress")?,
                sender_address: args.address("senderAddress")?,
                order_hash: args.word("orderHash")?,
                maker_asset_data: args.bytes("makerAssetData")?,
                taker_asset_data: args.bytes("takerAssetData")?,
            }),
            (ContractFamily::Exchange, "CancelUpTo") => {
                Self::ExchangeCancelUpTo(ExchangeCancelUpToEvent {
                    maker_address: args.address("makerAddress")?,
                    sender_address: args.address("senderAddress")?,
                    order_epoch: args.uint("orderEpoch")?,
                })
            }
            _ => return Err(args.failure(format!("no typed event for {family} {event}"))),
        };
        Ok(ev)
    }
}

// ─── DecodedArgs ─────────────────────────────────────────────────────────────

/// Named argument values of one decoded log, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArgs {
    pub event: String,
    pub values: Vec<(String, DynSolValue)>,
}

impl DecodedArgs {
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    fn require(&self, name: &str) -> Result<&DynSolValue, DecodeError> {
        self.get(name)
            .ok_or_else(|| self.failure(format!("missing argument '{name}'")))
    }

    fn failure(&self, reason: String) -> DecodeError {
        DecodeError::PayloadDecodeFailure {
            event: self.event.clone(),
            reason,
        }
    }

    fn mismatch(&self, name: &str, expected: &str) -> DecodeError {
        self.failure(format!("argument '{name}' is not {expected}"))
    }

    pub fn address(&self, name: &str) -> Result<Address, DecodeError> {
        match self.require(name)? {
            DynSolValue::Address(a) => Ok(*a),
            _ => Err(self.mismatch(name, "an address")),
        }
    }

    pub fn uint(&self, name: &str) -> Result<U256, DecodeError> {
        match self.require(name)? {
            DynSolValue::Uint(u, _) => Ok(*u),
            _ => Err(self.mismatch(name, "an unsigned integer")),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, DecodeError> {
        match self.require(name)? {
            DynSolValue::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(name, "a bool")),
        }
    }

    /// A `bytes32` argument (or any opaque 32-byte topic).
    pub fn word(&self, name: &str) -> Result<B256, DecodeError> {
        match self.require(name)? {
            DynSolValue::FixedBytes(w, 32) => Ok(*w),
            _ => Err(self.mismatch(name, "bytes32")),
        }
    }

    pub fn bytes(&self, name: &str) -> Result<Bytes, DecodeError> {
        match self.require(name)? {
            DynSolValue::Bytes(b) => Ok(Bytes::copy_from_slice(b)),
            _ => Err(self.mismatch(name, "a byte string")),
        }
    }
}
