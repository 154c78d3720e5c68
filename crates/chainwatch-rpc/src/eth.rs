//! `EthClient`: the Ethereum JSON-RPC methods chainwatch needs, on top of any
//! [`RpcTransport`].
//!
//! | capability                       | method                  |
//! |----------------------------------|-------------------------|
//! | `ChainClient::header_by_number`  | `eth_getBlockByNumber`  |
//! | `ChainClient::header_by_hash`    | `eth_getBlockByHash`    |
//! | `ChainClient::filter_logs`       | `eth_getLogs`           |
//! | `BalanceFetcher::get_balances`   | batched `eth_getBalance`|

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use chainwatch_balance::BalanceFetcher;
use chainwatch_core::{BlockSelection, ChainClient, ClientError, Log, LogFilter, MiniHeader};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, RpcId};
use crate::transport::RpcTransport;

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcHeader {
    hash: B256,
    parent_hash: B256,
    number: U64,
}

impl From<RpcHeader> for MiniHeader {
    fn from(h: RpcHeader) -> Self {
        MiniHeader::new(h.number.to::<u64>(), h.hash, h.parent_hash)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: U64,
    block_hash: B256,
    transaction_hash: B256,
    log_index: U64,
    #[serde(default)]
    removed: bool,
}

impl From<RpcLog> for Log {
    fn from(l: RpcLog) -> Self {
        Log {
            address: l.address,
            topics: l.topics,
            data: l.data,
            block_number: l.block_number.to::<u64>(),
            block_hash: l.block_hash,
            tx_hash: l.transaction_hash,
            log_index: l.log_index.to::<u64>(),
            removed: l.removed,
        }
    }
}

/// `eth_getLogs` filter object for `filter`.
fn filter_params(filter: &LogFilter) -> Value {
    let mut obj = Map::new();
    match filter.block {
        BlockSelection::Hash(hash) => {
            obj.insert("blockHash".into(), json!(hash));
        }
        BlockSelection::Range { from, to } => {
            obj.insert("fromBlock".into(), json!(format!("{from:#x}")));
            obj.insert("toBlock".into(), json!(format!("{to:#x}")));
        }
    }
    if !filter.addresses.is_empty() {
        obj.insert("address".into(), json!(filter.addresses));
    }
    if !filter.topics.is_empty() {
        obj.insert("topics".into(), json!([filter.topics]));
    }
    Value::Object(obj)
}

fn block_tag(number: Option<u64>) -> Value {
    match number {
        Some(n) => json!(format!("{n:#x}")),
        None => json!("latest"),
    }
}

// ─── EthClient ───────────────────────────────────────────────────────────────

pub struct EthClient<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> EthClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(&self, method: &str, params: Vec<Value>) -> JsonRpcRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        JsonRpcRequest::new(id, method, params)
    }

    /// Call `method` and deserialize its result; a `null` result is `None`.
    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Option<R>, ClientError> {
        let resp = self.transport.send(self.request(method, params)).await?;
        let value = resp.into_result().map_err(TransportError::Rpc)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }
}

#[async_trait]
impl<T: RpcTransport> ChainClient for EthClient<T> {
    async fn header_by_number(&self, number: Option<u64>) -> Result<MiniHeader, ClientError> {
        self.call::<RpcHeader>("eth_getBlockByNumber", vec![block_tag(number), json!(false)])
            .await?
            .map(MiniHeader::from)
            .ok_or(ClientError::NotFound)
    }

    async fn header_by_hash(&self, hash: B256) -> Result<MiniHeader, ClientError> {
        self.call::<RpcHeader>("eth_getBlockByHash", vec![json!(hash), json!(false)])
            .await?
            .map(MiniHeader::from)
            .ok_or(ClientError::NotFound)
    }

    async fn filter_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ClientError> {
        let logs = self
            .call::<Vec<RpcLog>>("eth_getLogs", vec![filter_params(filter)])
            .await?
            .unwrap_or_default();
        Ok(logs.into_iter().map(Log::from).collect())
    }
}

#[async_trait]
impl<T: RpcTransport> BalanceFetcher for EthClient<T> {
    /// One batched `eth_getBalance` per address at `latest`.
    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<U256>, ClientError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let reqs: Vec<JsonRpcRequest> = addresses
            .iter()
            .map(|a| self.request("eth_getBalance", vec![json!(a), json!("latest")]))
            .collect();
        let ids: Vec<RpcId> = reqs.iter().map(|r| r.id.clone()).collect();

        let mut by_id: HashMap<RpcId, _> = self
            .transport
            .send_batch(reqs)
            .await?
            .into_iter()
            .map(|resp| (resp.id.clone(), resp))
            .collect();

        ids.iter()
            .map(|id| {
                let resp = by_id.remove(id).ok_or_else(|| {
                    ClientError::InvalidResponse(format!("missing batch response for id {id}"))
                })?;
                let value = resp.into_result().map_err(TransportError::Rpc)?;
                serde_json::from_value::<U256>(value)
                    .map_err(|e| ClientError::InvalidResponse(format!("eth_getBalance: {e}")))
            })
            .collect()
    }
}
