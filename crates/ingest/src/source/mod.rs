//! Upstream event sources.
//!
//! An [`EventSource`] answers one-shot range queries and opens streams that
//! deliver the rest of the range chunk by chunk. A network client
//! implements the same pair of traits; the crate ships replay sources that
//! serve events held in memory or read from a JSON-lines file.

mod jsonl;
pub use jsonl::JsonlSource;

#[cfg(any(test, feature = "test-utils"))]
mod mem;
#[cfg(any(test, feature = "test-utils"))]
pub use mem::MemSource;

mod replay;
pub use replay::ReplayStream;

use alloy::primitives::BlockNumber;
use chainsync_types::{LogFilter, RawEvent};
use std::future::Future;

/// Default for [`StreamConfig::batch_size`].
pub const DEFAULT_STREAM_BATCH_SIZE: usize = 1000;

/// Default for [`StreamConfig::concurrency`].
pub const DEFAULT_STREAM_CONCURRENCY: usize = 10;

/// Errors produced by an upstream source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The stream broke off before reaching the tip.
    #[error("upstream stream interrupted: {0}")]
    Interrupted(String),

    /// Reading the source failed.
    #[error("upstream io error: {0}")]
    Io(#[from] std::io::Error),

    /// An upstream payload could not be decoded.
    #[error("upstream decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Upstream columns requested for each record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelection {
    /// Block columns.
    pub block: Vec<&'static str>,
    /// Log columns.
    pub log: Vec<&'static str>,
    /// Transaction columns.
    pub transaction: Vec<&'static str>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            block: vec![
                "difficulty",
                "number",
                "timestamp",
                "hash",
                "extra_data",
                "gas_limit",
                "gas_used",
                "logs_bloom",
                "miner",
                "mix_hash",
                "nonce",
                "parent_hash",
                "receipts_root",
                "sha3_uncles",
                "state_root",
                "total_difficulty",
                "transactions_root",
                "size",
            ],
            log: vec![
                "block_number",
                "block_hash",
                "log_index",
                "transaction_index",
                "transaction_hash",
                "data",
                "address",
                "topic0",
                "topic1",
                "topic2",
                "topic3",
            ],
            transaction: vec![
                "block_hash",
                "block_number",
                "chain_id",
                "from",
                "gas",
                "gas_price",
                "hash",
                "input",
                "kind",
                "max_fee_per_gas",
                "max_priority_fee_per_gas",
                "nonce",
                "r",
                "s",
                "to",
                "transaction_index",
                "v",
                "value",
            ],
        }
    }
}

/// A range query: every event matching `filter` from `from_block` onward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// First block to return (inclusive).
    pub from_block: BlockNumber,
    /// Which logs to return.
    pub filter: LogFilter,
    /// Which columns to return.
    pub field_selection: FieldSelection,
}

impl Query {
    /// Query every event matching `filter` from `from_block` onward, with the
    /// default field selection.
    pub fn new(from_block: BlockNumber, filter: LogFilter) -> Self {
        Self { from_block, filter, field_selection: FieldSelection::default() }
    }

    /// Whether a raw event falls inside the query.
    ///
    /// An event without a block number is in range, so that it reaches the
    /// batcher and is reported as malformed.
    pub fn matches(&self, event: &RawEvent) -> bool {
        let in_range = event.block_number().is_none_or(|n| n >= self.from_block);
        in_range
            && self
                .filter
                .matches_upstream(&event.log.address.unwrap_or_default(), &event.log.topics)
    }
}

/// Streaming parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Whether the upstream client retries failed requests internally.
    pub retry: bool,
    /// Target number of events per chunk.
    pub batch_size: usize,
    /// Number of concurrent upstream requests.
    pub concurrency: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            retry: true,
            batch_size: DEFAULT_STREAM_BATCH_SIZE,
            concurrency: DEFAULT_STREAM_CONCURRENCY,
        }
    }
}

/// One chunk of upstream events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    /// Matched events, in block order.
    pub events: Vec<RawEvent>,
    /// Where the next query should start, if there is more to fetch.
    pub next_block: Option<BlockNumber>,
}

impl QueryResponse {
    /// Whether this chunk marks the tip: nothing delivered and nowhere to
    /// continue from.
    pub fn is_tip(&self) -> bool {
        self.events.is_empty() && self.next_block.is_none()
    }
}

/// An open upstream stream.
pub trait EventStream: Send {
    /// Receive the next chunk. `Ok(None)` means the stream reached the tip.
    fn recv(&mut self) -> impl Future<Output = Result<Option<QueryResponse>, SourceError>> + Send;
}

/// An upstream event provider.
pub trait EventSource: Send + Sync {
    /// The stream type returned by [`open_stream`](Self::open_stream).
    type Stream: EventStream;

    /// Run a single range query.
    fn fetch(
        &self,
        query: &Query,
    ) -> impl Future<Output = Result<QueryResponse, SourceError>> + Send;

    /// Open a stream over the rest of the range.
    fn open_stream(
        &self,
        query: Query,
        config: StreamConfig,
    ) -> impl Future<Output = Result<Self::Stream, SourceError>> + Send;
}
