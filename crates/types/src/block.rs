//! Persisted block records.

use crate::{Checkpoint, EncodingError, EventPosition};
use alloy::primitives::{Address, B64, B256, BlockNumber, Bloom, Bytes, U256};

/// A block referenced by at least one ingested log.
///
/// Blocks are immutable once written. The same block is usually observed many
/// times (once per log it contains), and every observation after the first is
/// an idempotent no-op at the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Chain the block belongs to.
    pub chain_id: u64,
    /// Block hash. Unique key.
    pub hash: B256,
    /// Block number.
    pub number: BlockNumber,
    /// Block timestamp, in seconds.
    pub timestamp: u64,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Ommers hash.
    pub sha3_uncles: B256,
    /// Fee recipient.
    pub miner: Address,
    /// State root.
    pub state_root: B256,
    /// Transactions root.
    pub transactions_root: B256,
    /// Receipts root.
    pub receipts_root: B256,
    /// Logs bloom filter.
    pub logs_bloom: Bloom,
    /// Difficulty.
    pub difficulty: U256,
    /// Total difficulty of the chain up to this block.
    pub total_difficulty: U256,
    /// Gas limit.
    pub gas_limit: U256,
    /// Gas used.
    pub gas_used: U256,
    /// Block size in bytes.
    pub size: U256,
    /// Base fee per gas. Zero before London.
    pub base_fee_per_gas: U256,
    /// Extra data.
    pub extra_data: Bytes,
    /// Mix hash.
    pub mix_hash: B256,
    /// Proof-of-work nonce.
    pub nonce: B64,
    /// Global position of the block event.
    pub checkpoint: Checkpoint,
}

impl Block {
    /// Position of this block's own event.
    pub fn position(&self) -> EventPosition {
        EventPosition::block(self.chain_id, self.timestamp, self.number)
    }

    /// Recompute the checkpoint from the block's fields.
    pub fn compute_checkpoint(&self) -> Result<Checkpoint, EncodingError> {
        self.position().encode()
    }
}
