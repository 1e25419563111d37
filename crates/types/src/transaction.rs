//! Persisted transaction records.

use crate::{Checkpoint, EncodingError, EventPosition};
use alloy::{
    eips::eip2930::AccessList,
    primitives::{Address, B256, BlockNumber, Bytes, U256},
};

/// Transaction type assumed when upstream does not report one (EIP-1559).
pub const DEFAULT_TX_TYPE: u8 = 2;

/// A transaction that emitted at least one ingested log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Chain the transaction belongs to.
    pub chain_id: u64,
    /// Transaction hash. Unique key.
    pub hash: B256,
    /// Hash of the enclosing block.
    pub block_hash: B256,
    /// Number of the enclosing block.
    pub block_number: BlockNumber,
    /// Timestamp of the enclosing block.
    pub block_timestamp: u64,
    /// Index within the block.
    pub transaction_index: u64,
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Gas limit.
    pub gas: U256,
    /// Gas price (effective price for legacy transactions).
    pub gas_price: U256,
    /// EIP-1559 max fee per gas.
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas.
    pub max_priority_fee_per_gas: U256,
    /// Sender nonce.
    pub nonce: u64,
    /// Call data.
    pub input: Bytes,
    /// Value transferred, in wei.
    pub value: U256,
    /// EIP-2718 type.
    pub tx_type: u8,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
    /// Signature `v` (or y-parity).
    pub v: U256,
    /// EIP-2930 access list.
    pub access_list: AccessList,
    /// Global position of the transaction event.
    pub checkpoint: Checkpoint,
}

impl Transaction {
    /// Position of this transaction's event.
    pub fn position(&self) -> EventPosition {
        EventPosition::transaction(
            self.chain_id,
            self.block_timestamp,
            self.block_number,
            self.transaction_index,
        )
    }

    /// Recompute the checkpoint from the transaction's fields.
    pub fn compute_checkpoint(&self) -> Result<Checkpoint, EncodingError> {
        self.position().encode()
    }
}
