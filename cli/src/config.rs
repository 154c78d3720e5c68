//! The `--config` document and the flags that override it.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::Context;
use chainwatch_balance::BalanceWatcherConfig;
use chainwatch_core::config::{StartBlock, WatcherConfig};
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::observability::LogConfig;

fn default_rpc_url() -> String {
    "http://localhost:8545".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub balance: BalanceWatcherConfig,
    #[serde(default)]
    pub erc20: Vec<Address>,
    #[serde(default)]
    pub erc721: Vec<Address>,
    #[serde(default)]
    pub exchange: Vec<Address>,
    /// Addresses whose native balance is tracked.
    #[serde(default)]
    pub watch_balance: Vec<Address>,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            watcher: WatcherConfig::default(),
            balance: BalanceWatcherConfig::default(),
            erc20: Vec::new(),
            erc721: Vec::new(),
            exchange: Vec::new(),
            watch_balance: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "chainwatch",
    about = "Follow the canonical chain and print decoded order events",
    long_about = "
chainwatch polls an Ethereum JSON-RPC node, tracks the canonical chain across
reorgs, decodes ERC20 / ERC721 / exchange events from registered contracts and
prints one JSON line per block event or balance change on stdout.
Logs go to stderr; RUST_LOG overrides --log-level.
",
    version
)]
pub struct Cli {
    /// JSON config file; flags override its values
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// JSON-RPC endpoint
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Delay between two block polls, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Number of recent headers retained for reorg detection
    #[arg(long)]
    pub retention_limit: Option<usize>,

    /// First block when starting fresh: a number or "latest"
    #[arg(long)]
    pub start_block: Option<StartBlock>,

    /// ERC20 contract to decode events from (repeatable)
    #[arg(long)]
    pub erc20: Vec<Address>,

    /// ERC721 contract to decode events from (repeatable)
    #[arg(long)]
    pub erc721: Vec<Address>,

    /// Exchange contract to decode events from (repeatable)
    #[arg(long)]
    pub exchange: Vec<Address>,

    /// Address whose native balance is tracked (repeatable)
    #[arg(long)]
    pub watch_balance: Vec<Address>,

    /// Default log level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// The config file (or defaults) with every given flag applied on top.
    pub fn resolve(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut CliConfig) {
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.watcher.polling_interval = Duration::from_millis(ms);
        }
        if let Some(limit) = self.retention_limit {
            config.watcher.retention_limit = limit;
        }
        if let Some(start) = self.start_block {
            config.watcher.start_block = start;
        }
        config.erc20.extend(&self.erc20);
        config.erc721.extend(&self.erc721);
        config.exchange.extend(&self.exchange);
        config.watch_balance.extend(&self.watch_balance);
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.json_logs {
            config.log.json = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let mut config: CliConfig = serde_json::from_str(
            r#"{
                "rpc_url": "http://node:8545",
                "watcher": {"polling_interval_ms": 2000, "retention_limit": 50},
                "erc20": ["0x1111111111111111111111111111111111111111"]
            }"#,
        )
        .unwrap();
        let cli = Cli::parse_from([
            "chainwatch",
            "--poll-interval-ms",
            "250",
            "--start-block",
            "19000000",
            "--erc20",
            "0x2222222222222222222222222222222222222222",
            "--json-logs",
        ]);

        cli.apply(&mut config);

        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.watcher.polling_interval, Duration::from_millis(250));
        assert_eq!(config.watcher.retention_limit, 50);
        assert_eq!(config.watcher.start_block, StartBlock::Number(19_000_000));
        assert_eq!(config.erc20.len(), 2);
        assert!(config.log.json);
    }

    #[test]
    fn defaults_without_file() {
        let cli = Cli::parse_from(["chainwatch"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.balance.chunk_size, 4000);
    }

    #[test]
    fn latest_start_block_flag() {
        let cli = Cli::parse_from(["chainwatch", "--start-block", "latest"]);
        assert_eq!(cli.start_block, Some(StartBlock::Latest));
    }
}
