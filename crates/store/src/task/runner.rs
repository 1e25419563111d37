//! Writer task runner.
//!
//! The [`WriterTask`] receives requests from a bounded channel and applies
//! them to the backend one at a time, in arrival order. It is the only code
//! that touches the backend, so batches land in exactly the order they were
//! sent.
//!
//! # Failure model
//!
//! Batch writes go through the task's [`RetryPolicy`]. A write that still
//! fails is reported to its caller when the caller is waiting. A dispatched
//! write has nobody to report to, so its failure stops the task: the channel
//! closes and [`WriterTask::run`] returns the error.

use crate::{
    ReadRequest, RetryPolicy, StoreError, StoreRequest, StoreResult, SyncStore, WriteRequest,
    WriterHandle,
};
use chainsync_types::{Block, Log, ScanInterval, Transaction};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

/// Default capacity of the request channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Writer task configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Capacity of the request channel. Senders wait when it is full.
    pub channel_capacity: usize,
    /// Retry policy for batch writes.
    pub retry: RetryPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { channel_capacity: DEFAULT_CHANNEL_CAPACITY, retry: RetryPolicy::default() }
    }
}

/// The task that owns the store backend.
///
/// # Processing Model
///
/// Requests are processed inline. Each one completes before the next is
/// received, so the cancellation token is only observed between requests and
/// never interrupts a transaction.
///
/// # Shutdown
///
/// [`WriterHandle::shutdown`] enqueues a terminal message. Because the
/// channel is FIFO, every request queued before it is applied first. The
/// task then closes the backend, acknowledges, and exits.
pub struct WriterTask<B: SyncStore> {
    backend: B,
    receiver: mpsc::Receiver<StoreRequest>,
    retry: RetryPolicy,
    cancel_token: CancellationToken,
}

impl<B: SyncStore> std::fmt::Debug for WriterTask<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterTask").field("retry", &self.retry).finish_non_exhaustive()
    }
}

impl<B: SyncStore> WriterTask<B> {
    /// Create a new writer task and return its handle.
    pub fn new(
        backend: B,
        config: WriterConfig,
        cancel_token: CancellationToken,
    ) -> (Self, WriterHandle) {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let task = Self { backend, receiver, retry: config.retry, cancel_token };
        (task, WriterHandle::new(sender))
    }

    /// Spawn the task and return the handle along with the task's join
    /// handle.
    ///
    /// The task runs until shutdown, cancellation, a failed dispatched write,
    /// or until every handle is dropped.
    pub fn spawn(
        backend: B,
        config: WriterConfig,
        cancel_token: CancellationToken,
    ) -> (WriterHandle, JoinHandle<StoreResult<()>>) {
        let (task, handle) = Self::new(backend, config, cancel_token);
        (handle, tokio::spawn(task.run()))
    }

    /// Run the task, processing requests until it stops.
    ///
    /// Returns `Ok(())` after a shutdown request or when every handle has
    /// been dropped, [`StoreError::Cancelled`] on cancellation, and the write
    /// error when a dispatched write fails.
    #[instrument(skip(self), name = "writer_task")]
    pub async fn run(mut self) -> StoreResult<()> {
        debug!("Writer task started");

        loop {
            let maybe_req = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                maybe_req = self.receiver.recv() => maybe_req,
            };

            let Some(req) = maybe_req else {
                self.stop().await;
                if self.cancel_token.is_cancelled() {
                    debug!("Writer task received cancellation signal");
                    return Err(StoreError::Cancelled);
                }
                debug!("Writer channel closed");
                return Ok(());
            };

            match req {
                StoreRequest::Read(req) => self.handle_read(req).await,
                StoreRequest::Write(req) => {
                    if let Err(err) = self.handle_write(req).await {
                        error!(%err, "Dispatched write failed, stopping writer task");
                        self.stop().await;
                        return Err(err);
                    }
                }
                StoreRequest::Shutdown { resp } => {
                    self.receiver.close();
                    let result = self.backend.close().await;
                    debug!(ok = result.is_ok(), "Writer task shut down");
                    let _ = resp.send(result);
                    return Ok(());
                }
            }
        }
    }

    /// Refuse further requests and release the backend.
    async fn stop(&mut self) {
        self.receiver.close();
        if let Err(err) = self.backend.close().await {
            error!(%err, "Failed to close store backend");
        }
    }

    async fn handle_read(&self, req: ReadRequest) {
        match req {
            ReadRequest::LatestBlock { resp } => {
                let _ = resp.send(self.backend.latest_block().await);
            }
            ReadRequest::GetBlock { hash, resp } => {
                let _ = resp.send(self.backend.get_block(hash).await);
            }
            ReadRequest::GetTransaction { hash, resp } => {
                let _ = resp.send(self.backend.get_transaction(hash).await);
            }
            ReadRequest::GetLog { id, resp } => {
                let _ = resp.send(self.backend.get_log(id).await);
            }
            ReadRequest::GetLogsAfter { checkpoint, limit, resp } => {
                let _ = resp.send(self.backend.get_logs_after(checkpoint, limit).await);
            }
            ReadRequest::GetScanIntervals { filter_id, resp } => {
                let _ = resp.send(self.backend.get_scan_intervals(filter_id).await);
            }
            ReadRequest::Counts { resp } => {
                let _ = resp.send(self.backend.counts().await);
            }
        }
    }

    /// Apply a write. Returns an error only for a failed dispatched write.
    async fn handle_write(&self, req: WriteRequest) -> StoreResult<()> {
        let (result, resp) = match req {
            WriteRequest::InsertLogs { logs, interval, resp } => {
                (self.write_logs(logs, interval).await, resp)
            }
            WriteRequest::InsertBlocks { blocks, resp } => (self.write_blocks(blocks).await, resp),
            WriteRequest::InsertTransactions { transactions, resp } => {
                (self.write_transactions(transactions).await, resp)
            }
            WriteRequest::InsertScanInterval { interval, resp } => {
                (self.write_interval(interval).await, resp)
            }
        };
        match resp {
            Some(resp) => {
                let _ = resp.send(result);
                Ok(())
            }
            None => result,
        }
    }

    async fn write_logs(&self, logs: Vec<Log>, interval: Option<ScanInterval>) -> StoreResult<()> {
        let count = logs.len();
        let backend = &self.backend;
        self.retry.run("insert_logs", move || backend.insert_logs(logs.clone())).await?;
        debug!(count, "Inserted logs");
        if let Some(interval) = interval {
            self.write_interval(interval).await?;
        }
        Ok(())
    }

    async fn write_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
        let count = blocks.len();
        let backend = &self.backend;
        self.retry.run("insert_blocks", move || backend.insert_blocks(blocks.clone())).await?;
        debug!(count, "Inserted blocks");
        Ok(())
    }

    async fn write_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
        let count = transactions.len();
        let backend = &self.backend;
        self.retry
            .run("insert_transactions", move || backend.insert_transactions(transactions.clone()))
            .await?;
        debug!(count, "Inserted transactions");
        Ok(())
    }

    async fn write_interval(&self, interval: ScanInterval) -> StoreResult<()> {
        let backend = &self.backend;
        self.retry
            .run("insert_scan_interval", move || backend.insert_scan_interval(interval.clone()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        TableCounts,
        conformance::{make_block, make_log, make_transaction},
        mem::MemStore,
    };
    use alloy::primitives::{B256, BlockNumber};
    use chainsync_types::Checkpoint;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicU32, Ordering},
        },
        time::Duration,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("injected failure")]
    struct Injected;

    /// A [`MemStore`] whose log inserts can be made to fail.
    #[derive(Debug, Clone, Default)]
    struct FlakyStore {
        inner: MemStore,
        contended: Arc<AtomicU32>,
        broken: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
    }

    impl SyncStore for FlakyStore {
        async fn insert_logs(&self, logs: Vec<Log>) -> StoreResult<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::backend(Injected));
            }
            let remaining = self.contended.load(Ordering::SeqCst);
            if remaining > 0 {
                self.contended.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::contention(Injected));
            }
            self.inner.insert_logs(logs).await
        }

        async fn insert_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
            self.inner.insert_blocks(blocks).await
        }

        async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
            self.inner.insert_transactions(transactions).await
        }

        async fn insert_scan_interval(&self, interval: ScanInterval) -> StoreResult<()> {
            self.inner.insert_scan_interval(interval).await
        }

        async fn latest_block(&self) -> StoreResult<Option<BlockNumber>> {
            self.inner.latest_block().await
        }

        async fn get_block(&self, hash: B256) -> StoreResult<Option<Block>> {
            self.inner.get_block(hash).await
        }

        async fn get_transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
            self.inner.get_transaction(hash).await
        }

        async fn get_log(&self, id: String) -> StoreResult<Option<Log>> {
            self.inner.get_log(id).await
        }

        async fn get_logs_after(
            &self,
            checkpoint: Checkpoint,
            limit: usize,
        ) -> StoreResult<Vec<Log>> {
            self.inner.get_logs_after(checkpoint, limit).await
        }

        async fn get_scan_intervals(&self, filter_id: String) -> StoreResult<Vec<ScanInterval>> {
            self.inner.get_scan_intervals(filter_id).await
        }

        async fn counts(&self) -> StoreResult<TableCounts> {
            self.inner.counts().await
        }

        async fn close(&self) -> StoreResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> WriterConfig {
        WriterConfig {
            channel_capacity: 4,
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
        }
    }

    #[tokio::test]
    async fn writes_and_reads_in_order() {
        let (handle, join) = WriterTask::spawn(MemStore::new(), config(), CancellationToken::new());

        let block = make_block(10);
        handle.dispatch_logs(vec![make_log(10, 0, 0), make_log(10, 0, 1)], None).await.unwrap();
        handle.dispatch_transactions(vec![make_transaction(10, 0)]).await.unwrap();
        handle.dispatch_blocks(vec![block.clone()]).await.unwrap();

        // Reads queue behind the dispatched writes.
        assert_eq!(handle.latest_block().await.unwrap(), Some(10));
        assert_eq!(handle.get_block(block.hash).await.unwrap(), Some(block));
        let counts = handle.counts().await.unwrap();
        assert_eq!((counts.blocks, counts.transactions, counts.logs), (1, 1, 2));

        handle.shutdown().await.unwrap();
        join.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn contention_is_retried() {
        let store = FlakyStore::default();
        store.contended.store(2, Ordering::SeqCst);
        let (handle, join) = WriterTask::spawn(store.clone(), config(), CancellationToken::new());

        let interval = ScanInterval::new("f", 10, 10);
        handle.insert_logs(vec![make_log(10, 0, 0)], Some(interval.clone())).await.unwrap();
        assert_eq!(handle.counts().await.unwrap().logs, 1);
        assert_eq!(handle.get_scan_intervals("f".into()).await.unwrap(), vec![interval]);

        handle.shutdown().await.unwrap();
        join.await.unwrap().unwrap();
        assert!(store.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn exhausted_retries_are_reported() {
        let store = FlakyStore::default();
        store.contended.store(5, Ordering::SeqCst);
        let (handle, join) = WriterTask::spawn(store, config(), CancellationToken::new());

        let err = handle.insert_logs(vec![make_log(10, 0, 0)], None).await.unwrap_err();
        assert!(matches!(err, StoreError::RetriesExhausted { attempts: 3, .. }));

        // Awaited failures leave the task running.
        assert_eq!(handle.counts().await.unwrap().logs, 0);
        handle.shutdown().await.unwrap();
        join.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failed_dispatch_stops_the_task() {
        let store = FlakyStore::default();
        store.broken.store(true, Ordering::SeqCst);
        let (handle, join) = WriterTask::spawn(store.clone(), config(), CancellationToken::new());

        handle.dispatch_logs(vec![make_log(10, 0, 0)], None).await.unwrap();
        let result = join.await.unwrap();
        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(handle.is_closed());
        assert!(matches!(handle.counts().await, Err(StoreError::SendFailed)));
        assert!(store.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_stops_the_task() {
        let cancel = CancellationToken::new();
        let (handle, join) = WriterTask::spawn(MemStore::new(), config(), cancel.clone());

        handle.dispatch_blocks(vec![make_block(1)]).await.unwrap();
        assert_eq!(handle.latest_block().await.unwrap(), Some(1));
        cancel.cancel();

        assert!(matches!(join.await.unwrap(), Err(StoreError::Cancelled)));
        assert!(matches!(handle.latest_block().await, Err(StoreError::SendFailed)));
    }

    #[tokio::test]
    async fn dropping_every_handle_ends_the_task() {
        let (handle, join) = WriterTask::spawn(MemStore::new(), config(), CancellationToken::new());
        drop(handle);
        join.await.unwrap().unwrap();
    }
}
