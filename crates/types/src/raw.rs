//! Raw upstream events and their conversion into storage records.
//!
//! Upstream delivers each matched log together with its block and
//! transaction. Which fields are present depends on the query's field
//! selection, so every field is optional here. [`RawEvent::into_records`]
//! validates the fields that correlate the three records and fills defaults
//! for the rest.

use crate::{Block, Checkpoint, EncodingError, EventPosition, Log, Transaction, DEFAULT_TX_TYPE};
use alloy::{
    eips::eip2930::AccessList,
    primitives::{Address, B64, B256, BlockNumber, Bloom, Bytes, U256},
};
use serde::{Deserialize, Serialize};

/// A block as delivered by upstream. Fields mirror [`Block`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBlock {
    pub number: Option<BlockNumber>,
    pub hash: Option<B256>,
    pub timestamp: Option<u64>,
    pub parent_hash: Option<B256>,
    pub sha3_uncles: Option<B256>,
    pub miner: Option<Address>,
    pub state_root: Option<B256>,
    pub transactions_root: Option<B256>,
    pub receipts_root: Option<B256>,
    pub logs_bloom: Option<Bloom>,
    pub difficulty: Option<U256>,
    pub total_difficulty: Option<U256>,
    pub gas_limit: Option<U256>,
    pub gas_used: Option<U256>,
    pub size: Option<U256>,
    pub base_fee_per_gas: Option<U256>,
    pub extra_data: Option<Bytes>,
    pub mix_hash: Option<B256>,
    pub nonce: Option<B64>,
}

/// A transaction as delivered by upstream. Fields mirror [`Transaction`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTransaction {
    pub hash: Option<B256>,
    pub block_hash: Option<B256>,
    pub block_number: Option<BlockNumber>,
    pub transaction_index: Option<u64>,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub nonce: Option<u64>,
    pub input: Option<Bytes>,
    pub value: Option<U256>,
    #[serde(rename = "type")]
    pub tx_type: Option<u8>,
    pub r: Option<U256>,
    pub s: Option<U256>,
    pub v: Option<U256>,
    pub access_list: Option<AccessList>,
}

/// A log as delivered by upstream. Fields mirror [`Log`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLog {
    pub block_number: Option<BlockNumber>,
    pub block_hash: Option<B256>,
    pub log_index: Option<u64>,
    pub transaction_index: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub address: Option<Address>,
    pub data: Option<Bytes>,
    /// Topics 0 through 3. Absent positions may be `null` or omitted.
    pub topics: Vec<Option<B256>>,
}

impl RawLog {
    /// The leading run of present topics.
    pub fn present_topics(&self) -> Vec<B256> {
        self.topics.iter().map_while(|t| *t).collect()
    }
}

/// One upstream event: a matched log plus the block and transaction it
/// references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// The block containing the log.
    pub block: RawBlock,
    /// The emitting transaction, if selected.
    pub transaction: Option<RawTransaction>,
    /// The matched log.
    pub log: RawLog,
}

impl RawEvent {
    /// The event's block number, from the block or, failing that, the log.
    pub fn block_number(&self) -> Option<BlockNumber> {
        self.block.number.or(self.log.block_number)
    }

    /// The event's block hash, from the block or, failing that, the log.
    pub fn block_hash(&self) -> Option<B256> {
        self.block.hash.or(self.log.block_hash)
    }

    /// Validate the event and build its storage records.
    pub fn into_records(self, chain_id: u64) -> Result<EventRecords, RecordError> {
        let number = self.block_number().ok_or(MalformedEvent::missing("block", "number"))?;
        let hash = self.block_hash().ok_or(MalformedEvent::missing("block", "hash"))?;
        let timestamp = self.block.timestamp.ok_or(MalformedEvent::missing("block", "timestamp"))?;
        let log_index = self.log.log_index.ok_or(MalformedEvent::missing("log", "log_index"))?;
        let topics = self.log.present_topics();
        let topic0 = *topics.first().ok_or(MalformedEvent::missing("log", "topic0"))?;

        let tx_index = self
            .log
            .transaction_index
            .or_else(|| self.transaction.as_ref().and_then(|t| t.transaction_index))
            .unwrap_or_default();
        let tx_hash = self
            .log
            .transaction_hash
            .or_else(|| self.transaction.as_ref().and_then(|t| t.hash))
            .unwrap_or_default();

        let log_checkpoint =
            EventPosition::log(chain_id, timestamp, number, tx_index, log_index).encode()?;
        let log = Log {
            chain_id,
            block_hash: hash,
            block_number: number,
            block_timestamp: timestamp,
            log_index,
            transaction_hash: tx_hash,
            transaction_index: tx_index,
            address: self.log.address.unwrap_or_default(),
            topic0,
            topic1: topics.get(1).copied(),
            topic2: topics.get(2).copied(),
            topic3: topics.get(3).copied(),
            data: self.log.data.unwrap_or_default(),
            checkpoint: log_checkpoint,
        };

        let transaction = self
            .transaction
            .filter(|t| t.hash.is_some())
            .map(|t| raw_transaction(t, chain_id, hash, number, timestamp, tx_index))
            .transpose()?;

        let block = raw_block(self.block, chain_id, hash, number, timestamp)?;

        Ok(EventRecords { log, block, transaction })
    }
}

fn raw_block(
    raw: RawBlock,
    chain_id: u64,
    hash: B256,
    number: BlockNumber,
    timestamp: u64,
) -> Result<Block, EncodingError> {
    let checkpoint: Checkpoint = EventPosition::block(chain_id, timestamp, number).encode()?;
    Ok(Block {
        chain_id,
        hash,
        number,
        timestamp,
        parent_hash: raw.parent_hash.unwrap_or_default(),
        sha3_uncles: raw.sha3_uncles.unwrap_or_default(),
        miner: raw.miner.unwrap_or_default(),
        state_root: raw.state_root.unwrap_or_default(),
        transactions_root: raw.transactions_root.unwrap_or_default(),
        receipts_root: raw.receipts_root.unwrap_or_default(),
        logs_bloom: raw.logs_bloom.unwrap_or_default(),
        difficulty: raw.difficulty.unwrap_or_default(),
        total_difficulty: raw.total_difficulty.unwrap_or_default(),
        gas_limit: raw.gas_limit.unwrap_or_default(),
        gas_used: raw.gas_used.unwrap_or_default(),
        size: raw.size.unwrap_or_default(),
        base_fee_per_gas: raw.base_fee_per_gas.unwrap_or_default(),
        extra_data: raw.extra_data.unwrap_or_default(),
        mix_hash: raw.mix_hash.unwrap_or_default(),
        nonce: raw.nonce.unwrap_or_default(),
        checkpoint,
    })
}

fn raw_transaction(
    raw: RawTransaction,
    chain_id: u64,
    block_hash: B256,
    block_number: BlockNumber,
    block_timestamp: u64,
    log_tx_index: u64,
) -> Result<Transaction, EncodingError> {
    let transaction_index = raw.transaction_index.unwrap_or(log_tx_index);
    let checkpoint =
        EventPosition::transaction(chain_id, block_timestamp, block_number, transaction_index)
            .encode()?;
    Ok(Transaction {
        chain_id,
        hash: raw.hash.unwrap_or_default(),
        block_hash: raw.block_hash.unwrap_or(block_hash),
        block_number: raw.block_number.unwrap_or(block_number),
        block_timestamp,
        transaction_index,
        from: raw.from.unwrap_or_default(),
        to: raw.to,
        gas: raw.gas.unwrap_or_default(),
        gas_price: raw.gas_price.unwrap_or_default(),
        max_fee_per_gas: raw.max_fee_per_gas.unwrap_or_default(),
        max_priority_fee_per_gas: raw.max_priority_fee_per_gas.unwrap_or_default(),
        nonce: raw.nonce.unwrap_or_default(),
        input: raw.input.unwrap_or_default(),
        value: raw.value.unwrap_or_default(),
        tx_type: raw.tx_type.unwrap_or(DEFAULT_TX_TYPE),
        r: raw.r.unwrap_or_default(),
        s: raw.s.unwrap_or_default(),
        v: raw.v.unwrap_or_default(),
        access_list: raw.access_list.unwrap_or_default(),
        checkpoint,
    })
}

/// The records built from one [`RawEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecords {
    /// The log itself.
    pub log: Log,
    /// The enclosing block.
    pub block: Block,
    /// The emitting transaction, when upstream delivered one.
    pub transaction: Option<Transaction>,
}

/// An event lacks a field needed to correlate its records. Such events are
/// dropped, not fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    /// A required field is absent.
    #[error("{record} is missing required field `{field}`")]
    MissingField {
        /// The record the field belongs to.
        record: &'static str,
        /// The missing field.
        field: &'static str,
    },
}

impl MalformedEvent {
    const fn missing(record: &'static str, field: &'static str) -> Self {
        Self::MissingField { record, field }
    }
}

/// Converting a [`RawEvent`] failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The event is malformed and should be dropped.
    #[error(transparent)]
    Malformed(#[from] MalformedEvent),
    /// A checkpoint could not be encoded. Fatal.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventKind, MAX_TRANSACTION_INDEX};

    fn event(number: u64, log_index: u64) -> RawEvent {
        RawEvent {
            block: RawBlock {
                number: Some(number),
                hash: Some(B256::with_last_byte(number as u8)),
                timestamp: Some(1_700_000_000 + number),
                gas_limit: Some(U256::from(30_000_000u64)),
                ..Default::default()
            },
            transaction: Some(RawTransaction {
                hash: Some(B256::repeat_byte(0x11)),
                transaction_index: Some(3),
                ..Default::default()
            }),
            log: RawLog {
                log_index: Some(log_index),
                transaction_index: Some(3),
                transaction_hash: Some(B256::repeat_byte(0x11)),
                address: Some(Address::repeat_byte(0x22)),
                topics: vec![Some(B256::repeat_byte(0x33)), None, None, None],
                ..Default::default()
            },
        }
    }

    #[test]
    fn builds_records() {
        let records = event(100, 4).into_records(8453).unwrap();
        assert_eq!(records.log.block_number, 100);
        assert_eq!(records.log.topic0, B256::repeat_byte(0x33));
        assert_eq!(records.log.topic1, None);
        assert_eq!(records.block.gas_limit, U256::from(30_000_000u64));
        assert_eq!(records.block.difficulty, U256::ZERO);

        let tx = records.transaction.unwrap();
        assert_eq!(tx.tx_type, DEFAULT_TX_TYPE);
        assert_eq!(tx.block_number, 100);
        assert_eq!(tx.block_hash, records.block.hash);

        let block_pos = records.block.checkpoint.decode().unwrap();
        assert_eq!(block_pos.kind, EventKind::Block);
        assert_eq!(block_pos.transaction_index, U256::from(MAX_TRANSACTION_INDEX));
        assert!(records.log.checkpoint < records.block.checkpoint);
        assert!(tx.checkpoint < records.log.checkpoint);
    }

    #[test]
    fn missing_fields_are_malformed() {
        let mut no_number = event(1, 0);
        no_number.block.number = None;
        assert_eq!(
            no_number.into_records(1),
            Err(RecordError::Malformed(MalformedEvent::missing("block", "number")))
        );

        let mut no_index = event(1, 0);
        no_index.log.log_index = None;
        assert!(matches!(no_index.into_records(1), Err(RecordError::Malformed(_))));

        let mut no_topics = event(1, 0);
        no_topics.log.topics.clear();
        assert!(matches!(no_topics.into_records(1), Err(RecordError::Malformed(_))));
    }

    #[test]
    fn block_number_falls_back_to_log() {
        let mut ev = event(7, 0);
        ev.block.number = None;
        ev.log.block_number = Some(7);
        assert_eq!(ev.into_records(1).unwrap().block.number, 7);
    }

    #[test]
    fn oversized_chain_id_is_an_encoding_error() {
        let err = event(1, 0).into_records(u64::MAX).unwrap_err();
        assert!(matches!(err, RecordError::Encoding(_)));
    }

    #[test]
    fn deserializes_sparse_json() {
        let json = r#"{
            "block": {"number": 5, "hash": "0x0000000000000000000000000000000000000000000000000000000000000005", "timestamp": 1700000005, "gas_used": "0x5208"},
            "log": {"log_index": 2, "topics": ["0x3333333333333333333333333333333333333333333333333333333333333333", null]}
        }"#;
        let ev: RawEvent = serde_json::from_str(json).unwrap();
        assert!(ev.transaction.is_none());
        let records = ev.into_records(1).unwrap();
        assert_eq!(records.block.gas_used, U256::from(21_000u64));
        assert!(records.transaction.is_none());
    }
}
