//! `LogDecoder` routes a raw log by emitter address and decodes it into a
//! [`ContractEvent`].
//!
//! Routing precedence is ERC20, then ERC721, then exchange. The event itself
//! is picked by `topics[0]` within the routed family, so a wrapped-ether
//! contract registered as ERC20 also resolves `Deposit` and `Withdrawal`.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, B256, I256, U256};
use chainwatch_core::Log;
use rayon::prelude::*;

use crate::abi::{ContractFamily, EventSchema, SchemaTable};
use crate::error::DecodeError;
use crate::events::{ContractEvent, DecodedArgs};

#[derive(Debug, Default)]
struct KnownContracts {
    erc20: HashSet<Address>,
    erc721: HashSet<Address>,
    exchange: HashSet<Address>,
}

impl KnownContracts {
    fn set(&self, family: ContractFamily) -> &HashSet<Address> {
        match family {
            ContractFamily::Erc20 => &self.erc20,
            ContractFamily::Erc721 => &self.erc721,
            ContractFamily::Exchange => &self.exchange,
        }
    }

    fn set_mut(&mut self, family: ContractFamily) -> &mut HashSet<Address> {
        match family {
            ContractFamily::Erc20 => &mut self.erc20,
            ContractFamily::Erc721 => &mut self.erc721,
            ContractFamily::Exchange => &mut self.exchange,
        }
    }
}

/// Decodes ERC20, ERC721 and exchange logs from registered contracts.
///
/// Registration takes `&self`; the decoder can be shared behind an `Arc`
/// and used from several threads.
#[derive(Debug)]
pub struct LogDecoder {
    erc20: SchemaTable,
    erc721: SchemaTable,
    exchange: SchemaTable,
    known: RwLock<KnownContracts>,
}

impl LogDecoder {
    /// Parse the embedded ABIs.
    pub fn new() -> Result<Self, DecodeError> {
        Ok(Self {
            erc20: SchemaTable::builtin(ContractFamily::Erc20)?,
            erc721: SchemaTable::builtin(ContractFamily::Erc721)?,
            exchange: SchemaTable::builtin(ContractFamily::Exchange)?,
            known: RwLock::new(KnownContracts::default()),
        })
    }

    // ─── Registration ────────────────────────────────────────────────────

    /// Admit `address` as a contract of `family`.
    pub fn register(&self, address: Address, family: ContractFamily) {
        if self.write().set_mut(family).insert(address) {
            tracing::debug!(%address, %family, "Registered contract");
        }
    }

    pub fn register_erc20(&self, address: Address) {
        self.register(address, ContractFamily::Erc20);
    }

    pub fn register_erc721(&self, address: Address) {
        self.register(address, ContractFamily::Erc721);
    }

    pub fn register_exchange(&self, address: Address) {
        self.register(address, ContractFamily::Exchange);
    }

    /// The family a log from `address` is routed to, if any.
    pub fn family_of(&self, address: &Address) -> Option<ContractFamily> {
        let known = self.read();
        ContractFamily::ALL
            .into_iter()
            .find(|family| known.set(*family).contains(address))
    }

    /// Every selector the decoder understands, across all families.
    ///
    /// Suitable as a topic-0 filter for log fetching.
    pub fn selectors(&self) -> Vec<B256> {
        let mut all: Vec<B256> = self
            .tables()
            .flat_map(|t| t.selectors())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        all.sort();
        all
    }

    pub fn table(&self, family: ContractFamily) -> &SchemaTable {
        match family {
            ContractFamily::Erc20 => &self.erc20,
            ContractFamily::Erc721 => &self.erc721,
            ContractFamily::Exchange => &self.exchange,
        }
    }

    // ─── Decoding ────────────────────────────────────────────────────────

    /// Name of the event `log` would decode as, without decoding its payload.
    pub fn event_name(&self, log: &Log) -> Result<&str, DecodeError> {
        let (_, schema) = self.route(log)?;
        Ok(schema.name.as_str())
    }

    /// Decode `log` into a typed event.
    pub fn decode(&self, log: &Log) -> Result<ContractEvent, DecodeError> {
        let (family, schema) = self.route(log)?;
        tracing::trace!(
            address = %log.address,
            %family,
            event = %schema.name,
            "Decoding log"
        );
        let args = decode_args(schema, log)?;
        ContractEvent::from_args(family, &schema.name, &args)
    }

    /// Decode `log` into named argument values, without building a typed event.
    pub fn decode_args(&self, log: &Log) -> Result<DecodedArgs, DecodeError> {
        let (_, schema) = self.route(log)?;
        decode_args(schema, log)
    }

    /// Decode many logs in parallel. Results are in input order.
    pub fn decode_batch(&self, logs: &[Log]) -> Vec<Result<ContractEvent, DecodeError>> {
        logs.par_iter().map(|log| self.decode(log)).collect()
    }

    fn route(&self, log: &Log) -> Result<(ContractFamily, &EventSchema), DecodeError> {
        let family = self
            .family_of(&log.address)
            .ok_or(DecodeError::UnsupportedSource {
                address: log.address,
            })?;
        let selector = log.selector().ok_or(DecodeError::MissingSelector)?;
        let schema = self
            .table(family)
            .get(&selector)
            .ok_or(DecodeError::UnknownEventSelector { selector })?;
        Ok((family, schema))
    }

    fn tables(&self) -> impl Iterator<Item = &SchemaTable> {
        [&self.erc20, &self.erc721, &self.exchange].into_iter()
    }

    fn read(&self) -> RwLockReadGuard<'_, KnownContracts> {
        self.known.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KnownContracts> {
        self.known.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─── Argument decoding ───────────────────────────────────────────────────────

/// Reconstruct every argument of `schema` from the log's topics and data.
fn decode_args(schema: &EventSchema, log: &Log) -> Result<DecodedArgs, DecodeError> {
    let topics = log.topics.get(1..).unwrap_or_default();
    let expected = schema.indexed_count();
    if topics.len() != expected {
        return Err(DecodeError::TopicArityMismatch {
            event: schema.name.clone(),
            expected,
            actual: topics.len(),
        });
    }

    let data_types: Vec<DynSolType> = schema.non_indexed().map(|p| p.ty.clone()).collect();
    let mut data_values = if data_types.is_empty() {
        Vec::new()
    } else {
        match DynSolType::Tuple(data_types).abi_decode_params(&log.data) {
            Ok(DynSolValue::Tuple(values)) => values,
            Ok(other) => vec![other],
            Err(e) => {
                return Err(DecodeError::PayloadDecodeFailure {
                    event: schema.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
    .into_iter();

    let mut topic_iter = topics.iter();
    let mut values = Vec::with_capacity(schema.params.len());
    for param in &schema.params {
        let value = if param.indexed {
            topic_iter.next().map(|t| decode_topic(t, &param.ty))
        } else {
            data_values.next()
        };
        let value = value.ok_or_else(|| DecodeError::PayloadDecodeFailure {
            event: schema.name.clone(),
            reason: format!("no value for argument '{}'", param.name),
        })?;
        values.push((param.name.clone(), value));
    }

    Ok(DecodedArgs {
        event: schema.name.clone(),
        values,
    })
}

/// Recover an indexed argument from its 32-byte topic.
///
/// Value types are stored in the topic directly. Dynamic types (strings,
/// byte strings, arrays, tuples) are hashed on emission, so the topic is
/// returned as an opaque `bytes32`.
pub fn decode_topic(topic: &B256, ty: &DynSolType) -> DynSolValue {
    match ty {
        DynSolType::Bool => DynSolValue::Bool(topic[31] != 0),
        DynSolType::Uint(bits) => DynSolValue::Uint(U256::from_be_bytes(topic.0), *bits),
        DynSolType::Int(bits) => DynSolValue::Int(I256::from_raw(U256::from_be_bytes(topic.0)), *bits),
        DynSolType::Address => DynSolValue::Address(Address::from_word(*topic)),
        DynSolType::FixedBytes(size) if *size <= 32 => {
            let mut word = B256::ZERO;
            word[..*size].copy_from_slice(&topic[..*size]);
            DynSolValue::FixedBytes(word, *size)
        }
        _ => DynSolValue::FixedBytes(*topic, 32),
    }
}
