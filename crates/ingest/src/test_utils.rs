//! Raw event fixtures.

use alloy::primitives::{Address, B256, Bytes, U256, address, b256, keccak256};
use chainsync_types::{RawBlock, RawEvent, RawLog, RawTransaction};

/// Chain id used by the fixtures.
pub const TEST_CHAIN_ID: u64 = 8453;

/// Emitting contract of every fixture log.
pub const TEST_ADDRESS: Address = address!("0xCF205808Ed36593aa40a44F10c7f7C2F67d4A4d4");

/// Topic0 of every fixture log.
pub const TEST_TOPIC0: B256 =
    b256!("0x2c76e7a47fd53e2854856ac3f0a5f3ee40d15cfaa82266357ea9779c486ab9c3");

/// Block hash of fixture block `number`.
pub fn block_hash(number: u64) -> B256 {
    B256::left_padding_from(&number.to_be_bytes())
}

/// Hash of fixture transaction `index` in block `number`.
pub fn tx_hash(number: u64, index: u64) -> B256 {
    keccak256([number.to_be_bytes(), index.to_be_bytes()].concat())
}

/// A complete upstream event for log `log_index` of transaction `tx_index`
/// in block `number`.
pub fn raw_event(number: u64, tx_index: u64, log_index: u64) -> RawEvent {
    let hash = block_hash(number);
    let tx = tx_hash(number, tx_index);
    RawEvent {
        block: RawBlock {
            number: Some(number),
            hash: Some(hash),
            timestamp: Some(1_700_000_000 + number * 2),
            parent_hash: Some(block_hash(number.saturating_sub(1))),
            miner: Some(Address::repeat_byte(0x4d)),
            gas_limit: Some(U256::from(30_000_000u64)),
            gas_used: Some(U256::from(21_000u64)),
            base_fee_per_gas: Some(U256::from(7u64)),
            ..Default::default()
        },
        transaction: Some(RawTransaction {
            hash: Some(tx),
            block_hash: Some(hash),
            block_number: Some(number),
            transaction_index: Some(tx_index),
            from: Some(Address::repeat_byte(0xf0)),
            to: Some(TEST_ADDRESS),
            gas: Some(U256::from(100_000u64)),
            nonce: Some(tx_index),
            value: Some(U256::from(10u64).pow(U256::from(18u64))),
            ..Default::default()
        }),
        log: RawLog {
            block_number: Some(number),
            block_hash: Some(hash),
            log_index: Some(log_index),
            transaction_index: Some(tx_index),
            transaction_hash: Some(tx),
            address: Some(TEST_ADDRESS),
            data: Some(Bytes::from(log_index.to_be_bytes().to_vec())),
            topics: vec![Some(TEST_TOPIC0), Some(B256::with_last_byte(log_index as u8))],
        },
    }
}

/// `per_block` single-transaction events in each block of `blocks`.
pub fn raw_events(blocks: impl IntoIterator<Item = u64>, per_block: u64) -> Vec<RawEvent> {
    blocks.into_iter().flat_map(|n| (0..per_block).map(move |i| raw_event(n, 0, i))).collect()
}
