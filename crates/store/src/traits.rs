//! Core trait definition for store backends.
//!
//! The [`SyncStore`] trait defines the interface that every backend must
//! implement. Backends own the schema and indexing; the trait only fixes the
//! transactional and idempotency guarantees the pipeline relies on.

use crate::StoreResult;
use alloy::primitives::{B256, BlockNumber};
use chainsync_types::{Block, Checkpoint, Log, ScanInterval, Transaction};
use std::future::Future;

/// Row counts of the persisted tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Rows in `blocks`.
    pub blocks: u64,
    /// Rows in `transactions`.
    pub transactions: u64,
    /// Rows in `logs`.
    pub logs: u64,
    /// Rows in `scan_intervals`.
    pub scan_intervals: u64,
}

/// Store backend trait.
///
/// All methods are async and return futures that are `Send`.
///
/// # Implementation Guide
///
/// Implementers must ensure:
///
/// - **Atomic batches**: each `insert_*` call applies its whole batch in one
///   transaction. A failure leaves no row of the batch behind.
///
/// - **Idempotency**: inserting a row whose key already exists is a silent
///   no-op, both across calls and within one batch. Blocks and transactions
///   are keyed by hash, logs by [`Log::id`].
///
/// - **Contention signalling**: busy, locked, serialization and deadlock
///   failures are reported as [`StoreError::Contention`] so the writer can
///   retry the batch. Everything else is [`StoreError::Backend`].
///
/// - **Lossless reads**: records read back compare equal to the records
///   written, checkpoint included.
///
/// [`StoreError::Contention`]: crate::StoreError::Contention
/// [`StoreError::Backend`]: crate::StoreError::Backend
pub trait SyncStore: Send + Sync + 'static {
    // --- Writes ---

    /// Insert a batch of logs.
    fn insert_logs(&self, logs: Vec<Log>) -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert a batch of blocks.
    fn insert_blocks(&self, blocks: Vec<Block>) -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert a batch of transactions.
    fn insert_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Append a scan interval. Intervals are never merged.
    fn insert_scan_interval(
        &self,
        interval: ScanInterval,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    // --- Reads ---

    /// The highest persisted block number, or `None` when no block is stored.
    fn latest_block(&self) -> impl Future<Output = StoreResult<Option<BlockNumber>>> + Send;

    /// Get a block by hash.
    fn get_block(&self, hash: B256) -> impl Future<Output = StoreResult<Option<Block>>> + Send;

    /// Get a transaction by hash.
    fn get_transaction(
        &self,
        hash: B256,
    ) -> impl Future<Output = StoreResult<Option<Transaction>>> + Send;

    /// Get a log by its id.
    fn get_log(&self, id: String) -> impl Future<Output = StoreResult<Option<Log>>> + Send;

    /// Up to `limit` logs with a checkpoint strictly greater than
    /// `checkpoint`, in checkpoint order.
    fn get_logs_after(
        &self,
        checkpoint: Checkpoint,
        limit: usize,
    ) -> impl Future<Output = StoreResult<Vec<Log>>> + Send;

    /// All scan intervals recorded for `filter_id`, oldest first.
    fn get_scan_intervals(
        &self,
        filter_id: String,
    ) -> impl Future<Output = StoreResult<Vec<ScanInterval>>> + Send;

    /// Row counts of every table.
    fn counts(&self) -> impl Future<Output = StoreResult<TableCounts>> + Send;

    // --- Lifecycle ---

    /// Release the storage handle. No other method is called afterwards.
    fn close(&self) -> impl Future<Output = StoreResult<()>> + Send;
}
