//! Conformance tests for SyncStore backends.
//!
//! These tests verify that any backend implementation behaves correctly
//! according to the SyncStore trait contract. To use these tests with a
//! custom backend, call [`conformance`] with a fresh backend instance. The
//! checks share the backend and run in order, so each one uses its own block
//! numbers.

use crate::{StoreResult, SyncStore, TableCounts};
use alloy::{
    eips::eip2930::{AccessList, AccessListItem},
    primitives::{Address, B64, B256, BlockNumber, Bloom, Bytes, U256, keccak256},
};
use chainsync_types::{Block, Checkpoint, EventPosition, Log, ScanInterval, Transaction};

/// Chain id used by the test records.
pub const TEST_CHAIN_ID: u64 = 8453;

/// Timestamp of block zero in the test records.
pub const TEST_GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Run all conformance tests against a backend.
///
/// This is the main entry point for testing a custom backend implementation.
pub async fn conformance<B: SyncStore>(backend: &B) -> StoreResult<()> {
    test_empty_storage(backend).await?;
    test_block_roundtrip(backend).await?;
    test_transaction_roundtrip(backend).await?;
    test_log_roundtrip(backend).await?;
    test_idempotent_insert(backend).await?;
    test_latest_block_tracking(backend).await?;
    test_logs_after(backend).await?;
    test_scan_intervals(backend).await?;
    Ok(())
}

/// Timestamp of a test block.
pub const fn test_timestamp(number: BlockNumber) -> u64 {
    TEST_GENESIS_TIMESTAMP + number * 2
}

/// Hash of a test block.
pub fn test_block_hash(number: BlockNumber) -> B256 {
    B256::left_padding_from(&number.to_be_bytes())
}

/// Hash of a test transaction.
pub fn test_tx_hash(number: BlockNumber, index: u64) -> B256 {
    keccak256(format!("tx-{number}-{index}"))
}

/// Create a test block with every field populated.
pub fn make_block(number: BlockNumber) -> Block {
    let timestamp = test_timestamp(number);
    Block {
        chain_id: TEST_CHAIN_ID,
        hash: test_block_hash(number),
        number,
        timestamp,
        parent_hash: test_block_hash(number.saturating_sub(1)),
        sha3_uncles: keccak256(b""),
        miner: Address::repeat_byte(0x4e),
        state_root: B256::repeat_byte(0x01),
        transactions_root: B256::repeat_byte(0x02),
        receipts_root: B256::repeat_byte(0x03),
        logs_bloom: Bloom::repeat_byte(0x10),
        difficulty: U256::ZERO,
        total_difficulty: U256::from(58_750_003_716_598_352_816_469u128),
        gas_limit: U256::from(30_000_000u64),
        gas_used: U256::from(12_345_678u64),
        size: U256::from(4_096u64),
        base_fee_per_gas: U256::from(7u64),
        extra_data: Bytes::from_static(b"chainsync"),
        mix_hash: B256::repeat_byte(0x04),
        nonce: B64::repeat_byte(0x42),
        checkpoint: EventPosition::block(TEST_CHAIN_ID, timestamp, number)
            .encode()
            .expect("test block fits in a checkpoint"),
    }
}

/// Create a test transaction at `index` in block `number`.
pub fn make_transaction(number: BlockNumber, index: u64) -> Transaction {
    let timestamp = test_timestamp(number);
    Transaction {
        chain_id: TEST_CHAIN_ID,
        hash: test_tx_hash(number, index),
        block_hash: test_block_hash(number),
        block_number: number,
        block_timestamp: timestamp,
        transaction_index: index,
        from: Address::repeat_byte(0xaa),
        to: (index % 2 == 0).then(|| Address::repeat_byte(0xbb)),
        gas: U256::from(21_000u64),
        gas_price: U256::from(1_000_000_000u64),
        max_fee_per_gas: U256::from(2_000_000_000u64),
        max_priority_fee_per_gas: U256::from(100_000_000u64),
        nonce: index,
        input: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
        value: U256::MAX,
        tx_type: 2,
        r: U256::from(1u64) << 255,
        s: U256::from(12_345u64),
        v: U256::from(1u64),
        access_list: AccessList(vec![AccessListItem {
            address: Address::repeat_byte(0xcc),
            storage_keys: vec![B256::repeat_byte(0x05), B256::repeat_byte(0x06)],
        }]),
        checkpoint: EventPosition::transaction(TEST_CHAIN_ID, timestamp, number, index)
            .encode()
            .expect("test transaction fits in a checkpoint"),
    }
}

/// Create a test log at `log_index`, emitted by transaction `tx_index` of
/// block `number`.
pub fn make_log(number: BlockNumber, tx_index: u64, log_index: u64) -> Log {
    let timestamp = test_timestamp(number);
    Log {
        chain_id: TEST_CHAIN_ID,
        block_hash: test_block_hash(number),
        block_number: number,
        block_timestamp: timestamp,
        log_index,
        transaction_hash: test_tx_hash(number, tx_index),
        transaction_index: tx_index,
        address: Address::repeat_byte(0xcf),
        topic0: keccak256("Trade(address,address,bool,uint256,uint256)"),
        topic1: Some(B256::repeat_byte(0x07)),
        topic2: (log_index % 2 == 0).then(|| B256::repeat_byte(0x08)),
        topic3: None,
        data: Bytes::from(log_index.to_be_bytes().to_vec()),
        checkpoint: EventPosition::log(TEST_CHAIN_ID, timestamp, number, tx_index, log_index)
            .encode()
            .expect("test log fits in a checkpoint"),
    }
}

/// Test that empty storage returns None/empty for all lookups.
pub async fn test_empty_storage<B: SyncStore>(backend: &B) -> StoreResult<()> {
    assert_eq!(backend.counts().await?, TableCounts::default());
    assert!(backend.latest_block().await?.is_none());
    assert!(backend.get_block(B256::ZERO).await?.is_none());
    assert!(backend.get_transaction(B256::ZERO).await?.is_none());
    assert!(backend.get_log(make_log(1, 0, 0).id()).await?.is_none());
    assert!(backend.get_logs_after(Checkpoint::zero(), 10).await?.is_empty());
    assert!(backend.get_scan_intervals("missing".to_owned()).await?.is_empty());
    Ok(())
}

/// Test that a block reads back exactly as written.
pub async fn test_block_roundtrip<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let block = make_block(100);
    backend.insert_blocks(vec![block.clone()]).await?;

    let stored = backend.get_block(block.hash).await?;
    let recomputed = stored.as_ref().and_then(|b| b.compute_checkpoint().ok());
    assert_eq!(recomputed, Some(block.checkpoint.clone()));
    assert_eq!(stored, Some(block));
    assert_eq!(backend.latest_block().await?, Some(100));
    Ok(())
}

/// Test that transactions read back exactly as written, with and without a
/// recipient.
pub async fn test_transaction_roundtrip<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let with_to = make_transaction(100, 0);
    let creation = make_transaction(100, 1);
    assert!(creation.to.is_none());
    backend.insert_transactions(vec![with_to.clone(), creation.clone()]).await?;

    let stored = backend.get_transaction(with_to.hash).await?;
    let recomputed = stored.as_ref().and_then(|t| t.compute_checkpoint().ok());
    assert_eq!(recomputed, Some(with_to.checkpoint.clone()));
    assert_eq!(stored, Some(with_to));
    assert_eq!(backend.get_transaction(creation.hash).await?, Some(creation));
    assert!(backend.get_transaction(test_tx_hash(100, 9)).await?.is_none());
    Ok(())
}

/// Test that logs read back exactly as written, with sparse topics.
pub async fn test_log_roundtrip<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let even = make_log(100, 0, 0);
    let odd = make_log(100, 1, 1);
    assert!(odd.topic2.is_none());
    backend.insert_logs(vec![even.clone(), odd.clone()]).await?;

    assert_eq!(backend.get_log(even.id()).await?, Some(even));
    assert_eq!(backend.get_log(odd.id()).await?, Some(odd));
    Ok(())
}

/// Test that re-inserting rows, within a batch or across batches, changes
/// nothing.
pub async fn test_idempotent_insert<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let before = backend.counts().await?;

    let logs = vec![make_log(200, 0, 0), make_log(200, 0, 1), make_log(200, 0, 0)];
    let blocks = vec![make_block(200), make_block(200)];
    let txs = vec![make_transaction(200, 0), make_transaction(200, 0)];

    backend.insert_logs(logs.clone()).await?;
    backend.insert_blocks(blocks.clone()).await?;
    backend.insert_transactions(txs.clone()).await?;
    let once = backend.counts().await?;
    assert_eq!(once.logs, before.logs + 2);
    assert_eq!(once.blocks, before.blocks + 1);
    assert_eq!(once.transactions, before.transactions + 1);

    backend.insert_logs(logs).await?;
    backend.insert_blocks(blocks).await?;
    backend.insert_transactions(txs).await?;
    assert_eq!(backend.counts().await?, once);
    assert_eq!(backend.get_block(test_block_hash(200)).await?, Some(make_block(200)));
    Ok(())
}

/// Test that the latest block is the maximum number stored, regardless of
/// insertion order.
pub async fn test_latest_block_tracking<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let before = backend.latest_block().await?.unwrap_or_default();

    backend.insert_blocks(vec![make_block(before + 50)]).await?;
    assert_eq!(backend.latest_block().await?, Some(before + 50));

    backend.insert_blocks(vec![make_block(before + 10)]).await?;
    assert_eq!(backend.latest_block().await?, Some(before + 50));
    Ok(())
}

/// Test checkpoint-ordered pagination over logs.
pub async fn test_logs_after<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let number = backend.latest_block().await?.unwrap_or_default() + 100;
    let expected: Vec<Log> = (0..5).map(|i| make_log(number, i / 2, i)).collect();

    // Insert out of order; reads must come back in checkpoint order.
    let mut shuffled = expected.clone();
    shuffled.swap(0, 4);
    shuffled.swap(1, 3);
    backend.insert_logs(shuffled).await?;

    let start = EventPosition::block(TEST_CHAIN_ID, test_timestamp(number - 1), number - 1)
        .encode()
        .expect("test block fits in a checkpoint");
    let mut cursor = start;
    let mut pages = Vec::new();
    loop {
        let page = backend.get_logs_after(cursor.clone(), 2).await?;
        let Some(last) = page.last() else { break };
        cursor = last.checkpoint.clone();
        pages.push(page);
    }
    assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
    assert_eq!(pages.concat(), expected);

    assert!(backend.get_logs_after(Checkpoint::zero(), 0).await?.is_empty());
    assert!(backend.get_logs_after(Checkpoint::max(), 10).await?.is_empty());

    let all = backend.get_logs_after(Checkpoint::zero(), usize::MAX).await?;
    assert_eq!(all.len() as u64, backend.counts().await?.logs);
    assert!(all.windows(2).all(|w| w[0].checkpoint < w[1].checkpoint));
    assert!(all.iter().all(|log| log.compute_checkpoint().ok() == Some(log.checkpoint.clone())));
    Ok(())
}

/// Test that scan intervals are appended per filter and never merged.
pub async fn test_scan_intervals<B: SyncStore>(backend: &B) -> StoreResult<()> {
    let before = backend.counts().await?.scan_intervals;

    let first = ScanInterval::new("conformance_a", 1, 10);
    let second = ScanInterval::new("conformance_a", 11, 20);
    let other = ScanInterval::new("conformance_b", 1, 5);
    backend.insert_scan_interval(first.clone()).await?;
    backend.insert_scan_interval(other.clone()).await?;
    backend.insert_scan_interval(second.clone()).await?;

    assert_eq!(backend.get_scan_intervals("conformance_a".to_owned()).await?, vec![first, second]);
    assert_eq!(backend.get_scan_intervals("conformance_b".to_owned()).await?, vec![other]);
    assert_eq!(backend.counts().await?.scan_intervals, before + 3);
    Ok(())
}
