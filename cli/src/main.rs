//! chainread CLI: read chain data through a failover pool of RPC endpoints.
//!
//! Usage:
//! ```bash
//! # List reachable endpoints, fastest first
//! chainread --rpc https://a.example --rpc https://b.example probe
//!
//! # Latest block number
//! CHAINREAD_RPC=https://a.example,https://b.example chainread head
//!
//! # A block with full transactions and uncle headers
//! chainread --rpc https://a.example block --number 17000000 --full
//!
//! # All receipts of a block, fetched in batches
//! chainread --rpc https://a.example receipts --block 17000000
//! ```

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use chainread_core::{
    BlockId, BlockNumber, ChainReader, ConnectionPool, MissingPolicy, PoolConfig,
};
use chainread_http::{HttpClientConfig, HttpDialer};

mod logging;

#[derive(Parser)]
#[command(
    name = "chainread",
    about = "Query blocks, transactions and receipts across redundant JSON-RPC endpoints",
    version
)]
struct Cli {
    /// JSON-RPC endpoint URL. Repeat the flag or pass a comma separated list.
    #[arg(long = "rpc", env = "CHAINREAD_RPC", value_delimiter = ',', required = true)]
    rpc: Vec<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Per-endpoint dial and handshake timeout, in seconds
    #[arg(long, default_value_t = 5)]
    dial_timeout: u64,

    /// Per-call timeout, in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Ask the next endpoint when one reports "not found"
    #[arg(long)]
    failover_missing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to every endpoint and list the reachable ones by latency
    Probe,

    /// Print the latest block number
    Head,

    /// Fetch a block by number or hash
    Block {
        /// Block number: decimal, 0x hex, "latest" or "pending"
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        number: Option<BlockNumber>,
        /// Block hash
        #[arg(long)]
        hash: Option<B256>,
        /// Include full transactions and uncle headers
        #[arg(long)]
        full: bool,
    },

    /// Fetch a transaction by hash
    Tx {
        #[arg(long)]
        hash: B256,
    },

    /// Fetch a transaction receipt by hash
    Receipt {
        #[arg(long)]
        hash: B256,
    },

    /// Fetch every receipt of a block in batches
    Receipts {
        /// Block number or hash
        #[arg(long)]
        block: BlockId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.json_logs);

    let pool = connect(&cli).await?;
    let result = run(&pool, cli.command).await;
    pool.close();

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn connect(cli: &Cli) -> Result<ConnectionPool> {
    let dial_timeout = Duration::from_secs(cli.dial_timeout);
    let request_timeout = Duration::from_secs(cli.request_timeout);
    let dialer = Arc::new(HttpDialer::new(HttpClientConfig {
        request_timeout,
        connect_timeout: dial_timeout,
    }));
    let config = PoolConfig {
        dial_timeout,
        request_timeout,
        missing_policy: if cli.failover_missing {
            MissingPolicy::Failover
        } else {
            MissingPolicy::Return
        },
        ..PoolConfig::default()
    };
    let addresses = cli.rpc.iter().map(|s| s.trim()).filter(|s| !s.is_empty());
    ConnectionPool::connect(addresses, dialer, config)
        .await
        .with_context(|| format!("could not connect to any of {} endpoint(s)", cli.rpc.len()))
}

async fn run(pool: &ConnectionPool, command: Commands) -> Result<Value> {
    match command {
        Commands::Probe => Ok(Value::Array(
            pool.endpoints()
                .into_iter()
                .map(|e| {
                    json!({
                        "url": e.address,
                        "clientVersion": e.client_version,
                        "networkId": e.network_id,
                        "latencyMs": e.latency.as_millis() as u64,
                        "state": e.state.to_string(),
                    })
                })
                .collect(),
        )),

        Commands::Head => {
            let number = pool.block_number().await.context("eth_blockNumber failed")?;
            Ok(json!({ "number": number }))
        }

        Commands::Block { number, hash, full } => {
            let block = match (hash, number) {
                (Some(hash), _) => pool.block_by_hash(hash, full).await,
                (None, number) => pool.block_by_number(number.unwrap_or_default(), full).await,
            }
            .context("block lookup failed")?;
            Ok(serde_json::to_value(&block)?)
        }

        Commands::Tx { hash } => {
            let (tx, pending) = pool
                .transaction_by_hash(hash)
                .await
                .with_context(|| format!("transaction {hash} lookup failed"))?;
            Ok(json!({ "transaction": tx, "pending": pending }))
        }

        Commands::Receipt { hash } => {
            let receipt = pool
                .transaction_receipt(hash)
                .await
                .with_context(|| format!("receipt {hash} lookup failed"))?;
            Ok(serde_json::to_value(&receipt)?)
        }

        Commands::Receipts { block } => {
            let header = match block {
                BlockId::Hash(hash) => pool.block_by_hash(hash, false).await,
                BlockId::Number(number) => pool.block_by_number(number, false).await,
            }
            .context("block lookup failed")?;
            let receipts = pool
                .receipts_for_block(header.hash(), &header.transaction_hashes())
                .await
                .context("receipt batch failed")?;
            tracing::info!(
                block = header.number(),
                count = receipts.len(),
                "Fetched block receipts"
            );
            Ok(serde_json::to_value(&receipts)?)
        }
    }
}
