//! Deduplicating batcher.
//!
//! Turns raw upstream events into three parallel batches of logs, blocks
//! and transactions. Blocks and transactions are deduplicated by hash
//! within the open batch; duplicates across batches are absorbed by the
//! store's idempotent inserts.

use alloy::primitives::{B256, BlockNumber};
use chainsync_types::{
    Block, EncodingError, Log, RawEvent, RecordError, ScanInterval, Transaction,
};
use std::collections::HashSet;
use tracing::warn;

/// Default flush threshold, in records per collection.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A non-empty batch of logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBatch {
    logs: Vec<Log>,
    first_block: BlockNumber,
    last_block: BlockNumber,
}

impl LogBatch {
    fn new(logs: Vec<Log>) -> Option<Self> {
        let first_block = logs.first()?.block_number;
        let last_block = logs.last()?.block_number;
        Some(Self { logs, first_block, last_block })
    }

    /// The logs in arrival order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Number of logs.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Always `false`; a batch holds at least one log.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Take the logs.
    pub fn into_logs(self) -> Vec<Log> {
        self.logs
    }

    /// The scan interval covered by this batch, from its first log's block
    /// to its last log's block.
    pub fn interval(&self, filter_id: impl Into<String>) -> ScanInterval {
        ScanInterval::new(filter_id, self.first_block, self.last_block)
    }
}

/// Collections handed off by the batcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batches {
    /// Logs, if any were taken.
    pub logs: Option<LogBatch>,
    /// Distinct blocks.
    pub blocks: Vec<Block>,
    /// Distinct transactions.
    pub transactions: Vec<Transaction>,
}

impl Batches {
    /// Whether nothing was taken.
    pub fn is_empty(&self) -> bool {
        self.logs.is_none() && self.blocks.is_empty() && self.transactions.is_empty()
    }
}

/// Accumulates records from raw events until a collection reaches the
/// flush threshold.
#[derive(Debug)]
pub struct Batcher {
    chain_id: u64,
    threshold: usize,
    logs: Vec<Log>,
    blocks: Vec<Block>,
    transactions: Vec<Transaction>,
    seen_blocks: HashSet<B256>,
    seen_transactions: HashSet<B256>,
    dropped: u64,
}

impl Batcher {
    /// Create a batcher for `chain_id` that fills collections up to
    /// `threshold` records. A zero threshold is treated as one.
    pub fn new(chain_id: u64, threshold: usize) -> Self {
        Self {
            chain_id,
            threshold: threshold.max(1),
            logs: Vec::new(),
            blocks: Vec::new(),
            transactions: Vec::new(),
            seen_blocks: HashSet::new(),
            seen_transactions: HashSet::new(),
            dropped: 0,
        }
    }

    /// Add one event. Returns `Ok(false)` if the event was malformed and
    /// dropped.
    pub fn push(&mut self, event: RawEvent) -> Result<bool, EncodingError> {
        let records = match event.into_records(self.chain_id) {
            Ok(records) => records,
            Err(RecordError::Malformed(err)) => {
                self.dropped += 1;
                warn!(%err, dropped = self.dropped, "Dropping malformed event");
                return Ok(false);
            }
            Err(RecordError::Encoding(err)) => return Err(err),
        };

        self.logs.push(records.log);
        if self.seen_blocks.insert(records.block.hash) {
            self.blocks.push(records.block);
        }
        if let Some(tx) = records.transaction
            && self.seen_transactions.insert(tx.hash)
        {
            self.transactions.push(tx);
        }
        Ok(true)
    }

    /// Add every event, returning how many were accepted.
    pub fn extend(
        &mut self,
        events: impl IntoIterator<Item = RawEvent>,
    ) -> Result<usize, EncodingError> {
        let mut accepted = 0;
        for event in events {
            accepted += usize::from(self.push(event)?);
        }
        Ok(accepted)
    }

    /// Take the collections that reached the threshold.
    ///
    /// Taking a collection also takes the pending collections that must be
    /// written before it: logs precede transactions, and both precede
    /// blocks. A stored block therefore never outruns its logs.
    pub fn take_full(&mut self) -> Batches {
        let full = |len: usize| len >= self.threshold;
        let take_blocks = full(self.blocks.len());
        let take_transactions = take_blocks || full(self.transactions.len());
        let take_logs = take_transactions || full(self.logs.len());

        Batches {
            logs: if take_logs { self.take_logs() } else { None },
            transactions: if take_transactions { self.take_transactions() } else { Vec::new() },
            blocks: if take_blocks { self.take_blocks() } else { Vec::new() },
        }
    }

    /// Take every non-empty collection regardless of the threshold.
    pub fn drain(&mut self) -> Batches {
        Batches {
            logs: self.take_logs(),
            transactions: self.take_transactions(),
            blocks: self.take_blocks(),
        }
    }

    fn take_logs(&mut self) -> Option<LogBatch> {
        LogBatch::new(std::mem::take(&mut self.logs))
    }

    fn take_transactions(&mut self) -> Vec<Transaction> {
        self.seen_transactions.clear();
        std::mem::take(&mut self.transactions)
    }

    fn take_blocks(&mut self) -> Vec<Block> {
        self.seen_blocks.clear();
        std::mem::take(&mut self.blocks)
    }

    /// Pending logs.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Pending distinct blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Pending distinct transactions.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Total pending records across all three collections.
    pub fn len(&self) -> usize {
        self.logs.len() + self.blocks.len() + self.transactions.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of malformed events dropped so far.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The flush threshold.
    pub const fn threshold(&self) -> usize {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_CHAIN_ID, raw_event, raw_events};

    #[test]
    fn dedups_within_open_batch() {
        let mut batcher = Batcher::new(TEST_CHAIN_ID, 1000);
        let accepted = batcher.extend((0..5).map(|i| raw_event(100, 0, i))).unwrap();
        assert_eq!(accepted, 5);
        assert_eq!(batcher.logs().len(), 5);
        assert_eq!(batcher.blocks().len(), 1);
        assert_eq!(batcher.transactions().len(), 1);
        assert_eq!(batcher.len(), 7);
        assert!(batcher.take_full().is_empty());
    }

    #[test]
    fn seen_set_resets_when_taken() {
        let mut batcher = Batcher::new(TEST_CHAIN_ID, 1000);
        batcher.push(raw_event(100, 0, 0)).unwrap();
        let drained = batcher.drain();
        assert_eq!(drained.blocks.len(), 1);
        assert!(batcher.is_empty());

        batcher.push(raw_event(100, 0, 1)).unwrap();
        assert_eq!(batcher.blocks().len(), 1);
        assert_eq!(batcher.transactions().len(), 1);
    }

    #[test]
    fn malformed_events_are_dropped() {
        let mut batcher = Batcher::new(TEST_CHAIN_ID, 10);
        let mut no_timestamp = raw_event(1, 0, 0);
        no_timestamp.block.timestamp = None;
        let mut no_index = raw_event(1, 0, 1);
        no_index.log.log_index = None;

        let events = vec![no_timestamp, raw_event(1, 0, 2), no_index, raw_event(2, 0, 0)];
        assert_eq!(batcher.extend(events).unwrap(), 2);
        assert_eq!(batcher.dropped(), 2);
        assert_eq!(batcher.logs().len(), 2);
    }

    #[test]
    fn encoding_overflow_is_fatal() {
        let mut batcher = Batcher::new(u64::MAX, 10);
        assert!(batcher.push(raw_event(1, 0, 0)).is_err());
        assert_eq!(batcher.dropped(), 0);
    }

    #[test]
    fn full_logs_flush_alone() {
        let mut batcher = Batcher::new(TEST_CHAIN_ID, 4);
        batcher.extend(raw_events([1], 4)).unwrap();
        let batches = batcher.take_full();
        let logs = batches.logs.unwrap();
        assert_eq!(logs.len(), 4);
        assert_eq!(logs.interval("f"), ScanInterval::new("f", 1, 1));
        assert!(batches.blocks.is_empty());
        assert!(batches.transactions.is_empty());
        assert_eq!(batcher.blocks().len(), 1);
    }

    #[test]
    fn full_blocks_take_pending_logs() {
        let mut batcher = Batcher::new(TEST_CHAIN_ID, 3);
        batcher.extend(raw_events([1], 3)).unwrap();
        assert_eq!(batcher.take_full().logs.map(|b| b.len()), Some(3));

        batcher.extend(raw_events([2, 3], 1)).unwrap();
        let batches = batcher.take_full();
        assert_eq!(batches.blocks.len(), 3);
        assert_eq!(batches.transactions.len(), 3);
        let logs = batches.logs.unwrap();
        assert_eq!(logs.interval("f"), ScanInterval::new("f", 2, 3));
        assert!(batcher.is_empty());
    }

    #[test]
    fn drain_takes_partials() {
        let mut batcher = Batcher::new(TEST_CHAIN_ID, 1000);
        batcher.extend(raw_events(1..=3, 2)).unwrap();
        let batches = batcher.drain();
        assert_eq!(batches.logs.as_ref().map(LogBatch::len), Some(6));
        assert_eq!(batches.blocks.len(), 3);
        assert_eq!(batches.transactions.len(), 3);
        assert!(batcher.drain().is_empty());
    }
}
