//! SQLite behaviour that the shared conformance suite cannot observe:
//! batch atomicity, lock contention and persistence across reopen.

#![cfg(feature = "test-utils")]

use alloy::primitives::{B256, BlockNumber};
use chainsync_store::{
    RetryPolicy, StoreError, StoreResult, SyncStore, TableCounts, WriterConfig, WriterTask,
    conformance::{make_block, make_log, make_transaction},
};
use chainsync_store_sql::{SqlStore, SqlStoreConfig};
use chainsync_types::{Block, Checkpoint, Log, ScanInterval, Transaction};
use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

fn file_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

const NO_WAIT: SqlStoreConfig = SqlStoreConfig { max_connections: 1, busy_timeout: Duration::ZERO };

#[tokio::test]
async fn failed_batch_writes_nothing() {
    let store = SqlStore::connect("sqlite::memory:").await.unwrap();
    sqlx::raw_sql(
        "CREATE TRIGGER reject_third_log BEFORE INSERT ON logs WHEN NEW.log_index = 2
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let logs = (0..4).map(|idx| make_log(10, 0, idx)).collect();
    let err = store.insert_logs(logs).await.unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(store.counts().await.unwrap().logs, 0);

    // Batches without the rejected row still go through.
    let logs = (0..2).map(|idx| make_log(10, 0, idx)).collect();
    store.insert_logs(logs).await.unwrap();
    assert_eq!(store.counts().await.unwrap().logs, 2);
}

#[tokio::test]
async fn held_lock_is_contention() {
    let dir = tempfile::tempdir().unwrap();
    let url = file_url(&dir.path().join("chainsync.db"));
    let writer = SqlStore::connect_with(&url, NO_WAIT).await.unwrap();
    let blocker = SqlStore::connect_with(&url, NO_WAIT).await.unwrap();

    let mut conn = blocker.pool().acquire().await.unwrap();
    sqlx::raw_sql("BEGIN IMMEDIATE").execute(&mut *conn).await.unwrap();

    let err = writer.insert_blocks(vec![make_block(1)]).await.unwrap_err();
    assert!(matches!(err, StoreError::Contention(_)), "unexpected error: {err}");

    sqlx::raw_sql("COMMIT").execute(&mut *conn).await.unwrap();
    drop(conn);
    writer.insert_blocks(vec![make_block(1)]).await.unwrap();
    assert_eq!(writer.latest_block().await.unwrap(), Some(1));
}

#[tokio::test]
async fn contention_clears_under_retry() {
    let dir = tempfile::tempdir().unwrap();
    let url = file_url(&dir.path().join("chainsync.db"));
    let writer = SqlStore::connect_with(&url, NO_WAIT).await.unwrap();
    let blocker = SqlStore::connect_with(&url, NO_WAIT).await.unwrap();

    let mut conn = blocker.pool().acquire().await.unwrap();
    sqlx::raw_sql("BEGIN IMMEDIATE").execute(&mut *conn).await.unwrap();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        sqlx::raw_sql("COMMIT").execute(&mut *conn).await.map(|_| ())
    });

    let store = &writer;
    let blocks = vec![make_block(7), make_block(8)];
    RetryPolicy::new(50, Duration::from_millis(20))
        .run("insert_blocks", move || store.insert_blocks(blocks.clone()))
        .await
        .unwrap();
    release.await.unwrap().unwrap();

    assert_eq!(writer.counts().await.unwrap().blocks, 2);
}

#[tokio::test]
async fn writer_task_persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let url = file_url(&dir.path().join("chainsync.db"));
    let store = SqlStore::connect(&url).await.unwrap();

    let (handle, join) =
        WriterTask::spawn(store, WriterConfig::default(), CancellationToken::new());
    for number in 1..=5 {
        let interval = ScanInterval::new("filter", number, number);
        handle.dispatch_logs(vec![make_log(number, 0, 0)], Some(interval)).await.unwrap();
        handle.dispatch_transactions(vec![make_transaction(number, 0)]).await.unwrap();
        handle.dispatch_blocks(vec![make_block(number)]).await.unwrap();
    }
    handle.shutdown().await.unwrap();
    join.await.unwrap().unwrap();

    let reopened = SqlStore::connect(&url).await.unwrap();
    let counts = reopened.counts().await.unwrap();
    assert_eq!(
        (counts.blocks, counts.transactions, counts.logs, counts.scan_intervals),
        (5, 5, 5, 5)
    );
    assert_eq!(reopened.latest_block().await.unwrap(), Some(5));

    let logs = reopened.get_logs_after(Checkpoint::zero(), 10).await.unwrap();
    assert_eq!(logs.len(), 5);
    assert_eq!(logs[0], make_log(1, 0, 0));

    let intervals = reopened.get_scan_intervals("filter".into()).await.unwrap();
    assert_eq!(intervals.first(), Some(&ScanInterval::new("filter", 1, 1)));
}

/// Aborts the first log batch partway through and reports the failure as
/// contention, recording the log count seen right after the rollback.
#[derive(Debug, Clone)]
struct InterruptedOnce {
    inner: SqlStore,
    armed: Arc<AtomicBool>,
    logs_after_failure: Arc<Mutex<Option<u64>>>,
}

impl InterruptedOnce {
    async fn new(inner: SqlStore) -> Self {
        // Rows 0..3 of the batch are written before the abort.
        sqlx::raw_sql(
            "CREATE TRIGGER interrupt_batch BEFORE INSERT ON logs WHEN NEW.log_index = 3
             BEGIN SELECT RAISE(ABORT, 'connection reset'); END;",
        )
        .execute(inner.pool())
        .await
        .unwrap();
        Self {
            inner,
            armed: Arc::new(AtomicBool::new(true)),
            logs_after_failure: Arc::new(Mutex::new(None)),
        }
    }
}

impl SyncStore for InterruptedOnce {
    async fn insert_logs(&self, logs: Vec<Log>) -> StoreResult<()> {
        let Err(err) = self.inner.insert_logs(logs).await else { return Ok(()) };
        if !self.armed.swap(false, Ordering::SeqCst) {
            return Err(err);
        }
        sqlx::raw_sql("DROP TRIGGER interrupt_batch")
            .execute(self.inner.pool())
            .await
            .map_err(StoreError::backend)?;
        let logs = self.inner.counts().await?.logs;
        *self.logs_after_failure.lock().unwrap() = Some(logs);
        Err(StoreError::contention(err))
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

    async fn get_logs_after(&self, checkpoint: Checkpoint, limit: usize) -> StoreResult<Vec<Log>> {
        self.inner.get_logs_after(checkpoint, limit).await
    }

    async fn get_scan_intervals(&self, filter_id: String) -> StoreResult<Vec<ScanInterval>> {
        self.inner.get_scan_intervals(filter_id).await
    }

    async fn counts(&self) -> StoreResult<TableCounts> {
        self.inner.counts().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn batch_interrupted_mid_write_is_retried_whole() {
    let store = InterruptedOnce::new(SqlStore::connect("sqlite::memory:").await.unwrap()).await;
    let config =
        WriterConfig { retry: RetryPolicy::new(3, Duration::from_millis(1)), ..Default::default() };
    let (handle, join) = WriterTask::spawn(store.clone(), config, CancellationToken::new());

    let logs: Vec<_> = (0..6).map(|idx| make_log(10, 0, idx)).collect();
    let interval = ScanInterval::new("filter", 10, 10);
    handle.insert_logs(logs.clone(), Some(interval.clone())).await.unwrap();

    assert_eq!(*store.logs_after_failure.lock().unwrap(), Some(0));
    assert_eq!(handle.get_logs_after(Checkpoint::zero(), 100).await.unwrap(), logs);
    assert_eq!(handle.get_scan_intervals("filter".into()).await.unwrap(), vec![interval]);

    handle.shutdown().await.unwrap();
    join.await.unwrap().unwrap();
}
