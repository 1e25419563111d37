//! Ergonomic handle for interacting with the writer task.
//!
//! The [`WriterHandle`] provides a convenient API for sending requests to the
//! writer task without needing to construct request types manually.

use crate::{ReadRequest, StoreError, StoreRequest, StoreResult, TableCounts, WriteRequest};
use alloy::primitives::{B256, BlockNumber};
use chainsync_types::{Block, Checkpoint, Log, ScanInterval, Transaction};
use tokio::sync::{mpsc, oneshot};

/// Handle for interacting with the writer task.
///
/// This handle can be cloned and shared across tasks. Sends wait while the
/// channel is full, which is how backpressure reaches producers.
#[derive(Clone, Debug)]
pub struct WriterHandle {
    sender: mpsc::Sender<StoreRequest>,
}

impl WriterHandle {
    /// Create a new handle with the given sender.
    pub(crate) const fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    /// Whether the writer task has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a request and wait for the response.
    async fn send<T>(
        &self,
        req: StoreRequest,
        rx: oneshot::Receiver<StoreResult<T>>,
    ) -> StoreResult<T> {
        self.sender.send(req).await.map_err(|_| StoreError::SendFailed)?;
        rx.await.map_err(|_| StoreError::Cancelled)?
    }

    /// Send a request without waiting for it to be applied.
    async fn dispatch(&self, req: WriteRequest) -> StoreResult<()> {
        self.sender.send(req.into()).await.map_err(|_| StoreError::SendFailed)
    }

    // ==========================================================================
    // Awaited writes
    // ==========================================================================

    /// Insert a log batch and wait for it to commit. The interval, if any, is
    /// recorded after the logs.
    pub async fn insert_logs(
        &self,
        logs: Vec<Log>,
        interval: Option<ScanInterval>,
    ) -> StoreResult<()> {
        let (resp, rx) = oneshot::channel();
        self.send(WriteRequest::InsertLogs { logs, interval, resp: Some(resp) }.into(), rx).await
    }

    /// Insert a block batch and wait for it to commit.
    pub async fn insert_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
        let (resp, rx) = oneshot::channel();
        self.send(WriteRequest::InsertBlocks { blocks, resp: Some(resp) }.into(), rx).await
    }

    /// Insert a transaction batch and wait for it to commit.
    pub async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
        let (resp, rx) = oneshot::channel();
        self.send(WriteRequest::InsertTransactions { transactions, resp: Some(resp) }.into(), rx)
            .await
    }

    /// Append a scan interval and wait for it to commit.
    pub async fn insert_scan_interval(&self, interval: ScanInterval) -> StoreResult<()> {
        let (resp, rx) = oneshot::channel();
        self.send(WriteRequest::InsertScanInterval { interval, resp: Some(resp) }.into(), rx).await
    }

    // ==========================================================================
    // Dispatched writes
    // ==========================================================================

    /// Queue a log batch. A failure stops the writer task.
    pub async fn dispatch_logs(
        &self,
        logs: Vec<Log>,
        interval: Option<ScanInterval>,
    ) -> StoreResult<()> {
        self.dispatch(WriteRequest::InsertLogs { logs, interval, resp: None }).await
    }

    /// Queue a block batch. A failure stops the writer task.
    pub async fn dispatch_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
        self.dispatch(WriteRequest::InsertBlocks { blocks, resp: None }).await
    }

    /// Queue a transaction batch. A failure stops the writer task.
    pub async fn dispatch_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
        self.dispatch(WriteRequest::InsertTransactions { transactions, resp: None }).await
    }

    // ==========================================================================
    // Reads
    // ==========================================================================

    /// Get the latest block number in storage.
    pub async fn latest_block(&self) -> StoreResult<Option<BlockNumber>> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::LatestBlock { resp }.into(), rx).await
    }

    /// Get a block by hash.
    pub async fn get_block(&self, hash: B256) -> StoreResult<Option<Block>> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::GetBlock { hash, resp }.into(), rx).await
    }

    /// Get a transaction by hash.
    pub async fn get_transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::GetTransaction { hash, resp }.into(), rx).await
    }

    /// Get a log by id.
    pub async fn get_log(&self, id: String) -> StoreResult<Option<Log>> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::GetLog { id, resp }.into(), rx).await
    }

    /// Up to `limit` logs after `checkpoint`, in checkpoint order.
    pub async fn get_logs_after(
        &self,
        checkpoint: Checkpoint,
        limit: usize,
    ) -> StoreResult<Vec<Log>> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::GetLogsAfter { checkpoint, limit, resp }.into(), rx).await
    }

    /// All scan intervals of a filter.
    pub async fn get_scan_intervals(&self, filter_id: String) -> StoreResult<Vec<ScanInterval>> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::GetScanIntervals { filter_id, resp }.into(), rx).await
    }

    /// Row counts of every table.
    pub async fn counts(&self) -> StoreResult<TableCounts> {
        let (resp, rx) = oneshot::channel();
        self.send(ReadRequest::Counts { resp }.into(), rx).await
    }

    // ==========================================================================
    // Lifecycle
    // ==========================================================================

    /// Apply everything queued so far, close the backend, and stop the task.
    pub async fn shutdown(&self) -> StoreResult<()> {
        let (resp, rx) = oneshot::channel();
        self.send(StoreRequest::Shutdown { resp }, rx).await
    }
}
