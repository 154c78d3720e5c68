//! Embedded contract ABIs and the selector → schema tables parsed from them.
//!
//! The three families are fixed at compile time and parsed once when a
//! [`LogDecoder`](crate::decoder::LogDecoder) is built. Decoding only indexes
//! into these tables.

use std::collections::HashMap;
use std::fmt;

use alloy_core::dyn_abi::{DynSolType, Specifier};
use alloy_core::json_abi::{Event, JsonAbi};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::selector::keccak256_signature;

/// ERC20 events, including the wrapped-ether `Deposit` / `Withdrawal` pair.
pub const ERC20_ABI: &str = include_str!("../abi/erc20.json");
/// ERC721 events.
pub const ERC721_ABI: &str = include_str!("../abi/erc721.json");
/// Exchange (v2) order events.
pub const EXCHANGE_ABI: &str = include_str!("../abi/exchange.json");

/// The contract families a log can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractFamily {
    Erc20,
    Erc721,
    Exchange,
}

impl ContractFamily {
    /// Routing precedence when an address is registered under several families.
    pub const ALL: [ContractFamily; 3] = [Self::Erc20, Self::Erc721, Self::Exchange];

    /// The embedded ABI document for this family.
    pub fn abi_json(&self) -> &'static str {
        match self {
            Self::Erc20 => ERC20_ABI,
            Self::Erc721 => ERC721_ABI,
            Self::Exchange => EXCHANGE_ABI,
        }
    }
}

impl fmt::Display for ContractFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erc20 => write!(f, "erc20"),
            Self::Erc721 => write!(f, "erc721"),
            Self::Exchange => write!(f, "exchange"),
        }
    }
}

// ─── EventSchema ─────────────────────────────────────────────────────────────

/// One argument of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub ty: DynSolType,
    pub indexed: bool,
}

/// A parsed event: name, canonical signature, selector and ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSchema {
    pub name: String,
    pub signature: String,
    pub selector: B256,
    pub params: Vec<EventParam>,
}

impl EventSchema {
    /// Build a schema from a JSON-ABI event definition.
    pub fn from_event(event: &Event) -> Result<Self, DecodeError> {
        let params = event
            .inputs
            .iter()
            .map(|input| {
                let ty = input.resolve().map_err(|e| {
                    DecodeError::SchemaParse(format!("{}.{}: {e}", event.name, input.name))
                })?;
                Ok(EventParam {
                    name: input.name.clone(),
                    ty,
                    indexed: input.indexed,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        let signature = event.signature();
        Ok(Self {
            name: event.name.clone(),
            selector: keccak256_signature(&signature),
            signature,
            params,
        })
    }

    /// Arguments carried in `topics[1..]`, in declaration order.
    pub fn indexed(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| p.indexed)
    }

    /// Arguments carried in the data payload, in declaration order.
    pub fn non_indexed(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| !p.indexed)
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed().count()
    }
}

// ─── SchemaTable ─────────────────────────────────────────────────────────────

/// Selector → schema lookup for one contract family.
#[derive(Debug, Clone)]
pub struct SchemaTable {
    family: ContractFamily,
    events: HashMap<B256, EventSchema>,
}

impl SchemaTable {
    /// Parse a JSON ABI document. Anonymous events are skipped.
    pub fn parse(family: ContractFamily, json: &str) -> Result<Self, DecodeError> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| DecodeError::SchemaParse(format!("{family}: {e}")))?;

        let mut events = HashMap::new();
        for event in abi.events().filter(|e| !e.anonymous) {
            let schema = EventSchema::from_event(event)?;
            events.insert(schema.selector, schema);
        }
        Ok(Self { family, events })
    }

    /// The table for one of the embedded ABIs.
    pub fn builtin(family: ContractFamily) -> Result<Self, DecodeError> {
        Self::parse(family, family.abi_json())
    }

    pub fn family(&self) -> ContractFamily {
        self.family
    }

    pub fn get(&self, selector: &B256) -> Option<&EventSchema> {
        self.events.get(selector)
    }

    /// Look an event up by name.
    pub fn by_name(&self, name: &str) -> Option<&EventSchema> {
        self.events.values().find(|s| s.name == name)
    }

    pub fn selectors(&self) -> impl Iterator<Item = B256> + '_ {
        self.events.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
