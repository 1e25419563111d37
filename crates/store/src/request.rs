//! Request and response types for the writer task.
//!
//! These types define the messages sent over the channel to the writer task.
//! Reads and writes share one channel so that every request is applied in
//! arrival order.

use crate::{StoreError, TableCounts};
use alloy::primitives::{B256, BlockNumber};
use chainsync_types::{Block, Checkpoint, Log, ScanInterval, Transaction};
use tokio::sync::oneshot;

/// Response sender type alias that propagates Result types.
pub type Responder<T, E = StoreError> = oneshot::Sender<Result<T, E>>;

/// Read requests for the writer task.
#[derive(Debug)]
pub enum ReadRequest {
    /// Get the latest block number.
    LatestBlock {
        /// The response channel.
        resp: Responder<Option<BlockNumber>>,
    },
    /// Get a block by hash.
    GetBlock {
        /// The block hash.
        hash: B256,
        /// The response channel.
        resp: Responder<Option<Block>>,
    },
    /// Get a transaction by hash.
    GetTransaction {
        /// The transaction hash.
        hash: B256,
        /// The response channel.
        resp: Responder<Option<Transaction>>,
    },
    /// Get a log by id.
    GetLog {
        /// The log id.
        id: String,
        /// The response channel.
        resp: Responder<Option<Log>>,
    },
    /// Page through logs in checkpoint order.
    GetLogsAfter {
        /// Exclusive lower bound.
        checkpoint: Checkpoint,
        /// Maximum number of logs to return.
        limit: usize,
        /// The response channel.
        resp: Responder<Vec<Log>>,
    },
    /// Get the scan intervals of a filter.
    GetScanIntervals {
        /// The filter id.
        filter_id: String,
        /// The response channel.
        resp: Responder<Vec<ScanInterval>>,
    },
    /// Get table row counts.
    Counts {
        /// The response channel.
        resp: Responder<TableCounts>,
    },
}

/// Write requests for the writer task.
///
/// A `None` responder marks a dispatched write: the caller does not wait for
/// the outcome, and a failure stops the task.
#[derive(Debug)]
pub enum WriteRequest {
    /// Insert a log batch, then record its scan interval.
    InsertLogs {
        /// The logs to insert.
        logs: Vec<Log>,
        /// The interval covered by the batch, recorded after it commits.
        interval: Option<ScanInterval>,
        /// The response channel.
        resp: Option<Responder<()>>,
    },
    /// Insert a block batch.
    InsertBlocks {
        /// The blocks to insert.
        blocks: Vec<Block>,
        /// The response channel.
        resp: Option<Responder<()>>,
    },
    /// Insert a transaction batch.
    InsertTransactions {
        /// The transactions to insert.
        transactions: Vec<Transaction>,
        /// The response channel.
        resp: Option<Responder<()>>,
    },
    /// Append a scan interval.
    InsertScanInterval {
        /// The interval.
        interval: ScanInterval,
        /// The response channel.
        resp: Option<Responder<()>>,
    },
}

/// Any message accepted by the writer task.
#[derive(Debug)]
pub enum StoreRequest {
    /// A read.
    Read(ReadRequest),
    /// A write.
    Write(WriteRequest),
    /// Close the backend and stop. Everything queued before this message is
    /// applied first.
    Shutdown {
        /// Receives the outcome of closing the backend.
        resp: Responder<()>,
    },
}

impl From<ReadRequest> for StoreRequest {
    fn from(req: ReadRequest) -> Self {
        Self::Read(req)
    }
}

impl From<WriteRequest> for StoreRequest {
    fn from(req: WriteRequest) -> Self {
        Self::Write(req)
    }
}
