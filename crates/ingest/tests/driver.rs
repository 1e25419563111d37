//! End-to-end runs of the driver over in-memory sources and stores.

use alloy::primitives::{B256, BlockNumber};
use chainsync_ingest::{
    Driver, DriverState, IngestConfig, IngestError,
    source::{MemSource, SourceError, StreamConfig},
    test_utils::{TEST_ADDRESS, TEST_CHAIN_ID, TEST_TOPIC0, block_hash, raw_events},
};
use chainsync_store::{StoreError, StoreResult, SyncStore, TableCounts, mem::MemStore};
use chainsync_types::{Block, Checkpoint, Log, LogFilter, ScanInterval, Transaction};

fn config(batch_size: usize) -> IngestConfig {
    let filter = LogFilter::new(TEST_CHAIN_ID)
        .with_addresses([TEST_ADDRESS])
        .with_topic(0, [TEST_TOPIC0]);
    IngestConfig::new(filter)
        .with_batch_size(batch_size)
        .with_stream(StreamConfig { batch_size, ..Default::default() })
}

async fn counts(store: &MemStore) -> (u64, u64, u64) {
    let TableCounts { blocks, transactions, logs, .. } = store.counts().await.unwrap();
    (logs, transactions, blocks)
}

#[tokio::test]
async fn single_block_end_to_end() {
    let store = MemStore::new();
    let source = MemSource::new(raw_events([100], 3));
    let summary = Driver::new(source, store.clone(), config(1000)).run().await.unwrap();

    assert_eq!(summary.events, 3);
    assert_eq!(summary.dropped, 0);
    assert_eq!(summary.scanned_to, 100);
    assert_eq!(summary.final_state, DriverState::Closed);
    assert_eq!(counts(&store).await, (3, 1, 1));

    let block = store.get_block(block_hash(100)).await.unwrap().unwrap();
    let logs = store.get_logs_after(Checkpoint::zero(), 10).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.windows(2).all(|w| w[0].checkpoint < w[1].checkpoint));
    assert!(logs.iter().all(|log| log.checkpoint < block.checkpoint));

    let filter_id = config(1).filter.id();
    let intervals = store.get_scan_intervals(filter_id.clone()).await.unwrap();
    assert_eq!(intervals, vec![ScanInterval::new(filter_id, 100, 100)]);
}

#[tokio::test]
async fn resumes_after_stored_blocks() {
    let store = MemStore::new();
    let source = MemSource::new(raw_events(1..=50, 2)).with_fetch_limit(10);
    let summary = Driver::new(source, store.clone(), config(10)).run().await.unwrap();
    assert_eq!(summary.events, 100);
    assert_eq!(counts(&store).await, (100, 50, 50));
    assert_eq!(store.latest_block().await.unwrap(), Some(50));

    // A longer history on restart: only blocks past 50 are requested.
    let source = MemSource::new(raw_events(1..=60, 2)).with_fetch_limit(10);
    let summary = Driver::new(source, store.clone(), config(10)).run().await.unwrap();
    assert_eq!(summary.events, 20);
    assert_eq!(summary.scanned_to, 60);
    assert_eq!(counts(&store).await, (120, 60, 60));

    let logs = store.get_logs_after(Checkpoint::zero(), usize::MAX).await.unwrap();
    assert!(logs.windows(2).all(|w| w[0].block_number <= w[1].block_number));
}

#[tokio::test]
async fn start_block_skips_history() {
    let store = MemStore::new();
    let source = MemSource::new(raw_events(1..=20, 1));
    Driver::new(source, store.clone(), config(5).with_start_block(11)).run().await.unwrap();
    assert_eq!(counts(&store).await, (10, 10, 10));
    assert_eq!(store.get_block(block_hash(10)).await.unwrap(), None);
}

#[tokio::test]
async fn interrupted_stream_recovers_on_restart() {
    let store = MemStore::new();
    let source = MemSource::new(raw_events(1..=40, 1)).with_fetch_limit(5).interrupt_after(2);
    let err = Driver::new(source, store.clone(), config(5)).run().await.unwrap_err();
    assert!(matches!(err, IngestError::Source(SourceError::Interrupted(_))), "{err}");

    // Every stored block has its logs stored too.
    let latest = store.latest_block().await.unwrap().unwrap();
    assert!(latest < 40);
    let (logs, _, _) = counts(&store).await;
    assert!(logs >= latest);

    let source = MemSource::new(raw_events(1..=40, 1)).with_fetch_limit(5);
    Driver::new(source, store.clone(), config(5)).run().await.unwrap();
    assert_eq!(counts(&store).await, (40, 40, 40));
}

#[tokio::test]
async fn stop_drains_partial_batches() {
    let store = MemStore::new();
    let source = MemSource::new(raw_events(1..=30, 1)).with_fetch_limit(7);
    let driver = Driver::new(source, store.clone(), config(1000));
    driver.stop_token().cancel();

    let summary = driver.run().await.unwrap();
    assert_eq!(summary.events, 7);
    assert_eq!(summary.final_state, DriverState::Closed);
    assert_eq!(counts(&store).await, (7, 7, 7));
    assert_eq!(store.latest_block().await.unwrap(), Some(7));
}

#[tokio::test]
async fn malformed_events_are_counted_and_skipped() {
    let mut events = raw_events(1..=4, 2);
    events[1].block.timestamp = None;
    events[5].log.log_index = None;

    let store = MemStore::new();
    let driver = Driver::new(MemSource::new(events), store.clone(), config(3));
    let summary = driver.run().await.unwrap();
    assert_eq!(summary.events, 8);
    assert_eq!(summary.dropped, 2);
    assert_eq!(counts(&store).await, (6, 4, 4));
}

#[tokio::test]
async fn event_without_block_number_is_dropped_and_counted() {
    let mut events = raw_events(1..=3, 1);
    events[1].block.number = None;
    events[1].log.block_number = None;

    let store = MemStore::new();
    let driver = Driver::new(MemSource::new(events), store.clone(), config(10));
    let summary = driver.run().await.unwrap();
    assert_eq!(summary.events, 3);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.scanned_to, 3);
    assert_eq!(counts(&store).await, (2, 2, 2));
    assert_eq!(store.get_block(block_hash(2)).await.unwrap(), None);
}

#[tokio::test]
async fn filter_excludes_other_contracts() {
    let mut events = raw_events(1..=6, 1);
    for event in events.iter_mut().step_by(2) {
        event.log.address = Some(alloy::primitives::Address::repeat_byte(0x99));
    }

    let store = MemStore::new();
    let driver = Driver::new(MemSource::new(events), store.clone(), config(10));
    let summary = driver.run().await.unwrap();
    assert_eq!(summary.events, 3);
    assert_eq!(counts(&store).await, (3, 3, 3));
}

/// Rejects every log batch.
#[derive(Debug, Clone, Default)]
struct BrokenLogs(MemStore);

impl SyncStore for BrokenLogs {
    async fn insert_logs(&self, _logs: Vec<Log>) -> StoreResult<()> {
        Err(StoreError::backend(std::io::Error::other("disk full")))
    }

    async fn insert_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
        self.0.insert_blocks(blocks).await
    }

    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
        self.0.insert_transactions(transactions).await
    }

    async fn insert_scan_interval(&self, interval: ScanInterval) -> StoreResult<()> {
        self.0.insert_scan_interval(interval).await
    }

    async fn latest_block(&self) -> StoreResult<Option<BlockNumber>> {
        self.0.latest_block().await
    }

    async fn get_block(&self, hash: B256) -> StoreResult<Option<Block>> {
        self.0.get_block(hash).await
    }

    async fn get_transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
        self.0.get_transaction(hash).await
    }

    async fn get_log(&self, id: String) -> StoreResult<Option<Log>> {
        self.0.get_log(id).await
    }

    async fn get_logs_after(&self, checkpoint: Checkpoint, limit: usize) -> StoreResult<Vec<Log>> {
        self.0.get_logs_after(checkpoint, limit).await
    }

    async fn get_scan_intervals(&self, filter_id: String) -> StoreResult<Vec<ScanInterval>> {
        self.0.get_scan_intervals(filter_id).await
    }

    async fn counts(&self) -> StoreResult<TableCounts> {
        self.0.counts().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.0.close().await
    }
}

#[tokio::test]
async fn writer_failure_halts_with_its_error() {
    let store = BrokenLogs::default();
    let source = MemSource::new(raw_events(1..=30, 1)).with_fetch_limit(5);
    let err = Driver::new(source, store.clone(), config(5)).run().await.unwrap_err();
    assert!(matches!(err, IngestError::Store(StoreError::Backend(_))), "{err}");

    // Nothing after the failed log batch was applied.
    assert_eq!(store.0.latest_block().await.unwrap(), None);
}
