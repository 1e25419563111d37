//! chainsync ingestion binary.
//!
//! Replays recorded upstream events from a JSON-lines file into a SQL store,
//! resuming after the highest stored block.
//!
//! # Usage
//!
//! ```bash
//! chainsync-ingest \
//!     --database-url sqlite://chainsync.db?mode=rwc \
//!     --input events.jsonl \
//!     --chain-id 8453 \
//!     --address 0xCF205808Ed36593aa40a44F10c7f7C2F67d4A4d4 \
//!     --topic0 0x2c76e7a47fd53e2854856ac3f0a5f3ee40d15cfaa82266357ea9779c486ab9c3
//! ```
//!
//! # Graceful Shutdown
//!
//! The first Ctrl+C stops reading at the next chunk boundary, flushes partial
//! batches and closes the store. A second Ctrl+C stops the writer without
//! waiting for queued batches; they are re-ingested on the next run.

use alloy::primitives::{Address, B256};
use anyhow::{Context, Result};
use chainsync_ingest::{
    DEFAULT_BATCH_SIZE, Driver, IngestConfig, source::JsonlSource,
};
use chainsync_store::{DEFAULT_CHANNEL_CAPACITY, WriterConfig};
use chainsync_store_sql::{DEFAULT_BUSY_TIMEOUT, SqlConnector, SqlStoreConfig};
use chainsync_types::LogFilter;
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

/// Checkpoint-ordered chain event ingestion.
#[derive(Parser, Debug)]
#[command(name = "chainsync-ingest")]
#[command(version)]
struct Args {
    /// Store URL (`sqlite:` or `postgres:`)
    #[arg(long, env = "CHAINSYNC_DATABASE_URL")]
    database_url: String,

    /// JSON-lines file of recorded upstream events
    #[arg(long)]
    input: PathBuf,

    /// Chain id stamped on every record
    #[arg(long, env = "CHAINSYNC_CHAIN_ID")]
    chain_id: u64,

    /// Emitting contract to ingest (repeatable)
    #[arg(long)]
    address: Vec<Address>,

    /// Topic0 to ingest (repeatable)
    #[arg(long)]
    topic0: Vec<B256>,

    /// Records per collection before a flush
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Lowest block to request
    #[arg(long, default_value_t = 0)]
    start_block: u64,

    /// Writer channel capacity
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// SQLite busy timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_BUSY_TIMEOUT.as_millis() as u64)]
    busy_timeout_ms: u64,
}

impl Args {
    fn filter(&self) -> LogFilter {
        let mut filter = LogFilter::new(self.chain_id);
        if !self.address.is_empty() {
            filter = filter.with_addresses(self.address.iter().copied());
        }
        if !self.topic0.is_empty() {
            filter = filter.with_topic(0, self.topic0.iter().copied());
        }
        filter
    }

    fn config(&self) -> IngestConfig {
        IngestConfig::new(self.filter())
            .with_batch_size(self.batch_size)
            .with_start_block(self.start_block)
            .with_writer(WriterConfig {
                channel_capacity: self.channel_capacity,
                ..Default::default()
            })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.config();
    config.validate()?;

    let source = JsonlSource::open(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let store = SqlConnector::new(args.database_url.as_str())
        .with_config(SqlStoreConfig {
            busy_timeout: Duration::from_millis(args.busy_timeout_ms),
            ..Default::default()
        })
        .connect()
        .await
        .context("failed to open store")?;

    tracing::info!(
        input = %args.input.display(),
        events = source.len(),
        chain_id = args.chain_id,
        batch_size = args.batch_size,
        "chainsync-ingest starting"
    );

    let driver = Driver::new(source, store, config);
    let stop = driver.stop_token();
    let writer_cancel = driver.writer_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("Shutdown signal received, draining...");
        stop.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Second signal received, abandoning queued writes");
            writer_cancel.cancel();
        }
    });

    let summary = driver.run().await.context("ingestion failed")?;
    tracing::info!(
        events = summary.events,
        dropped = summary.dropped,
        scanned_to = summary.scanned_to,
        elapsed_secs = summary.elapsed.as_secs(),
        state = %summary.final_state,
        "Done"
    );
    Ok(())
}
