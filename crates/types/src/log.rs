//! Persisted log records.

use crate::{Checkpoint, EncodingError, EventPosition};
use alloy::primitives::{Address, B256, BlockNumber, Bytes};

/// An ingested log.
///
/// Identified by `(block_hash, log_index)`, see [`Log::id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    /// Chain the log belongs to.
    pub chain_id: u64,
    /// Hash of the enclosing block.
    pub block_hash: B256,
    /// Number of the enclosing block.
    pub block_number: BlockNumber,
    /// Timestamp of the enclosing block.
    pub block_timestamp: u64,
    /// Index of the log within the block.
    pub log_index: u64,
    /// Hash of the emitting transaction.
    pub transaction_hash: B256,
    /// Index of the emitting transaction within the block.
    pub transaction_index: u64,
    /// Emitting contract.
    pub address: Address,
    /// Event signature topic.
    pub topic0: B256,
    /// First indexed argument.
    pub topic1: Option<B256>,
    /// Second indexed argument.
    pub topic2: Option<B256>,
    /// Third indexed argument.
    pub topic3: Option<B256>,
    /// Non-indexed data.
    pub data: Bytes,
    /// Global position of the log event.
    pub checkpoint: Checkpoint,
}

impl Log {
    /// The string id stored as the primary key: `{block_hash}-0x{log_index:x}`.
    pub fn id(&self) -> String {
        log_id(&self.block_hash, self.log_index)
    }

    /// Position of this log's event.
    pub fn position(&self) -> EventPosition {
        EventPosition::log(
            self.chain_id,
            self.block_timestamp,
            self.block_number,
            self.transaction_index,
            self.log_index,
        )
    }

    /// Recompute the checkpoint from the log's fields.
    pub fn compute_checkpoint(&self) -> Result<Checkpoint, EncodingError> {
        self.position().encode()
    }
}

/// Build the id of the log at `log_index` in the block `block_hash`.
pub fn log_id(block_hash: &B256, log_index: u64) -> String {
    format!("{block_hash:#x}-{log_index:#x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_format() {
        let hash = B256::repeat_byte(0xab);
        let id = log_id(&hash, 26);
        assert_eq!(id, format!("0x{}-0x1a", "ab".repeat(32)));
    }
}
