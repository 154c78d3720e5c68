//! chainwatch CLI: follow the canonical chain and print decoded order events.
//!
//! ```bash
//! chainwatch --rpc-url http://localhost:8545 \
//!     --exchange 0x4f833a24e1f95d70f028921e27040ca56e09ab0b \
//!     --erc20 0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2 \
//!     --watch-balance 0x90cf64cbb199523c893a1d519243e214b8e0b472
//! ```
//!
//! Output on stdout is one JSON object per line:
//! `{"type":"block", ...}` for added/removed blocks with their decoded events,
//! `{"type":"balance", ...}` for balance changes.

mod config;
mod observability;

use std::sync::Arc;

use anyhow::{Context, Result};
use chainwatch_balance::{BalanceChange, BalanceFetcher, BalanceWatcher};
use chainwatch_core::{BlockEvent, BlockWatcher, WatchError};
use chainwatch_decoder::LogDecoder;
use chainwatch_rpc::{EthClient, HttpClientConfig, HttpRpcClient};
use clap::Parser;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::{Cli, CliConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve()?;
    observability::init_tracing(&config.log).context("initialising tracing")?;
    run(config).await
}

async fn run(config: CliConfig) -> Result<()> {
    let transport = HttpRpcClient::new(&config.rpc_url, HttpClientConfig::default())
        .context("building RPC transport")?;
    let client = Arc::new(EthClient::new(transport));

    let decoder = LogDecoder::new().context("loading embedded ABIs")?;
    for address in &config.erc20 {
        decoder.register_erc20(*address);
    }
    for address in &config.erc721 {
        decoder.register_erc721(*address);
    }
    for address in &config.exchange {
        decoder.register_exchange(*address);
    }

    let mut watcher_config = config.watcher.clone();
    if watcher_config.topics.is_empty() {
        watcher_config.topics = decoder.selectors();
    }
    let watcher = BlockWatcher::new(Arc::clone(&client), watcher_config);
    let (block_tx, mut blocks) = mpsc::channel(16);
    let _subscription = watcher.subscribe(block_tx);
    let mut errors = watcher.start_polling()?;

    let balances = BalanceWatcher::new(Arc::clone(&client), config.balance.clone());
    let mut changes = balances.receive();
    if !config.watch_balance.is_empty() {
        let initial = client
            .get_balances(&config.watch_balance)
            .await
            .context("fetching initial balances")?;
        balances.add_many(config.watch_balance.iter().copied().zip(initial));
        balances.start()?;
    }

    tracing::info!(
        rpc = %config.rpc_url,
        contracts = config.erc20.len() + config.erc721.len() + config.exchange.len(),
        balances = balances.watched(),
        "chainwatch running, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(batch) = blocks.recv() => {
                for event in &batch {
                    print_line(&block_line(&decoder, event));
                }
            }
            Some(change) = changes.recv() => print_line(&balance_line(&change)),
            Some(err) = errors.recv() => report(&err),
        }
    }

    watcher.stop_polling().await;
    balances.stop().await;
    Ok(())
}

fn block_line(decoder: &LogDecoder, event: &BlockEvent) -> Value {
    let header = &event.header;
    let decoded: Vec<Value> = decoder
        .decode_batch(&header.logs)
        .into_iter()
        .zip(&header.logs)
        .filter_map(|(result, log)| match result {
            Ok(ev) => Some(json!({
                "txHash": log.tx_hash,
                "logIndex": log.log_index,
                "event": ev,
            })),
            Err(e) if e.is_unsupported() => None,
            Err(e) => {
                tracing::debug!(tx = %log.tx_hash, error = %e, "Undecodable log");
                None
            }
        })
        .collect();

    json!({
        "type": "block",
        "kind": event.kind.to_string(),
        "number": header.number,
        "hash": header.hash,
        "parentHash": header.parent_hash,
        "events": decoded,
    })
}

fn balance_line(change: &BalanceChange) -> Value {
    json!({
        "type": "balance",
        "address": change.address,
        "balance": change.balance.to_string(),
    })
}

fn print_line(value: &Value) {
    println!("{value}");
}

fn report(err: &WatchError) {
    if err.is_transient() {
        tracing::debug!(error = %err, "Transient watcher error");
    } else {
        tracing::error!(error = %err, "Watcher error");
    }
}
