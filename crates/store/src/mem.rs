//! In-memory store backend for testing.
//!
//! This backend stores all data in memory using standard Rust collections.
//! It is primarily intended for testing and development.

use crate::{StoreResult, SyncStore, TableCounts};
use alloy::primitives::{B256, BlockNumber};
use chainsync_types::{Block, Checkpoint, Log, ScanInterval, Transaction};
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};
use tokio::sync::RwLock;

/// Inner storage state.
#[derive(Default)]
struct MemStoreInner {
    blocks: HashMap<B256, Block>,
    transactions: HashMap<B256, Transaction>,
    logs: HashMap<String, Log>,
    /// `(checkpoint, id)` of every log, for ordered pagination.
    log_order: BTreeSet<(Checkpoint, String)>,
    scan_intervals: Vec<ScanInterval>,
}

/// In-memory store backend.
///
/// Cloning yields another handle to the same data. Every call takes the
/// lock once, so each batch is applied atomically.
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<RwLock<MemStoreInner>>,
}

impl MemStore {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemStore").finish_non_exhaustive()
    }
}

impl SyncStore for MemStore {
    async fn insert_logs(&self, logs: Vec<Log>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        for log in logs {
            let id = log.id();
            if inner.logs.contains_key(&id) {
                continue;
            }
            inner.log_order.insert((log.checkpoint.clone(), id.clone()));
            inner.logs.insert(id, log);
        }
        Ok(())
    }

    async fn insert_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        for block in blocks {
            inner.blocks.entry(block.hash).or_insert(block);
        }
        Ok(())
    }

    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        for tx in transactions {
            inner.transactions.entry(tx.hash).or_insert(tx);
        }
        Ok(())
    }

    async fn insert_scan_interval(&self, interval: ScanInterval) -> StoreResult<()> {
        self.inner.write().await.scan_intervals.push(interval);
        Ok(())
    }

    async fn latest_block(&self) -> StoreResult<Option<BlockNumber>> {
        Ok(self.inner.read().await.blocks.values().map(|b| b.number).max())
    }

    async fn get_block(&self, hash: B256) -> StoreResult<Option<Block>> {
        Ok(self.inner.read().await.blocks.get(&hash).cloned())
    }

    async fn get_transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
        Ok(self.inner.read().await.transactions.get(&hash).cloned())
    }

    async fn get_log(&self, id: String) -> StoreResult<Option<Log>> {
        Ok(self.inner.read().await.logs.get(&id).cloned())
    }

    async fn get_logs_after(&self, checkpoint: Checkpoint, limit: usize) -> StoreResult<Vec<Log>> {
        let inner = self.inner.read().await;
        Ok(inner
            .log_order
            .range((checkpoint.clone(), String::new())..)
            .skip_while(|(cp, _)| *cp == checkpoint)
            .take(limit)
            .filter_map(|(_, id)| inner.logs.get(id).cloned())
            .collect())
    }

    async fn get_scan_intervals(&self, filter_id: String) -> StoreResult<Vec<ScanInterval>> {
        let inner = self.inner.read().await;
        Ok(inner.scan_intervals.iter().filter(|i| i.filter_id == filter_id).cloned().collect())
    }

    async fn counts(&self) -> StoreResult<TableCounts> {
        let inner = self.inner.read().await;
        Ok(TableCounts {
            blocks: inner.blocks.len() as u64,
            transactions: inner.transactions.len() as u64,
            logs: inner.logs.len() as u64,
            scan_intervals: inner.scan_intervals.len() as u64,
        })
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
