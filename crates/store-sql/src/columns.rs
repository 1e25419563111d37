//! Column name constants for SQL row extraction.
//!
//! These constants are used with `sqlx::Row::try_get()` to extract values
//! from query results. Centralising them here prevents typos in string
//! literals that would otherwise only surface at runtime.

// ── shared columns ──────────────────────────────────────────────────────────
pub(crate) const COL_HASH: &str = "hash";
pub(crate) const COL_CHAIN_ID: &str = "chain_id";
pub(crate) const COL_CHECKPOINT: &str = "checkpoint";
pub(crate) const COL_BLOCK_HASH: &str = "block_hash";
pub(crate) const COL_BLOCK_NUMBER: &str = "block_number";
pub(crate) const COL_BLOCK_TIMESTAMP: &str = "block_timestamp";
pub(crate) const COL_TRANSACTION_INDEX: &str = "transaction_index";
pub(crate) const COL_NONCE: &str = "nonce";

// ── block columns ───────────────────────────────────────────────────────────
pub(crate) const COL_NUMBER: &str = "number";
pub(crate) const COL_TIMESTAMP: &str = "timestamp";
pub(crate) const COL_PARENT_HASH: &str = "parent_hash";
pub(crate) const COL_SHA3_UNCLES: &str = "sha3_uncles";
pub(crate) const COL_MINER: &str = "miner";
pub(crate) const COL_STATE_ROOT: &str = "state_root";
pub(crate) const COL_TRANSACTIONS_ROOT: &str = "transactions_root";
pub(crate) const COL_RECEIPTS_ROOT: &str = "receipts_root";
pub(crate) const COL_LOGS_BLOOM: &str = "logs_bloom";
pub(crate) const COL_DIFFICULTY: &str = "difficulty";
pub(crate) const COL_TOTAL_DIFFICULTY: &str = "total_difficulty";
pub(crate) const COL_GAS_LIMIT: &str = "gas_limit";
pub(crate) const COL_GAS_USED: &str = "gas_used";
pub(crate) const COL_SIZE: &str = "size";
pub(crate) const COL_BASE_FEE_PER_GAS: &str = "base_fee_per_gas";
pub(crate) const COL_EXTRA_DATA: &str = "extra_data";
pub(crate) const COL_MIX_HASH: &str = "mix_hash";

// ── transaction columns ─────────────────────────────────────────────────────
pub(crate) const COL_FROM_ADDRESS: &str = "from_address";
pub(crate) const COL_TO_ADDRESS: &str = "to_address";
pub(crate) const COL_GAS: &str = "gas";
pub(crate) const COL_GAS_PRICE: &str = "gas_price";
pub(crate) const COL_MAX_FEE_PER_GAS: &str = "max_fee_per_gas";
pub(crate) const COL_MAX_PRIORITY_FEE_PER_GAS: &str = "max_priority_fee_per_gas";
pub(crate) const COL_INPUT: &str = "input";
pub(crate) const COL_VALUE: &str = "value";
pub(crate) const COL_TX_TYPE: &str = "tx_type";
pub(crate) const COL_SIG_R: &str = "r";
pub(crate) const COL_SIG_S: &str = "s";
pub(crate) const COL_SIG_V: &str = "v";
pub(crate) const COL_ACCESS_LIST: &str = "access_list";

// ── log columns ─────────────────────────────────────────────────────────────
pub(crate) const COL_LOG_INDEX: &str = "log_index";
pub(crate) const COL_TRANSACTION_HASH: &str = "transaction_hash";
pub(crate) const COL_ADDRESS: &str = "address";
pub(crate) const COL_TOPIC0: &str = "topic0";
pub(crate) const COL_TOPIC1: &str = "topic1";
pub(crate) const COL_TOPIC2: &str = "topic2";
pub(crate) const COL_TOPIC3: &str = "topic3";
pub(crate) const COL_DATA: &str = "data";

// ── scan interval columns ───────────────────────────────────────────────────
pub(crate) const COL_FILTER_ID: &str = "filter_id";
pub(crate) const COL_START_BLOCK: &str = "start_block";
pub(crate) const COL_END_BLOCK: &str = "end_block";

// ── aggregate aliases ───────────────────────────────────────────────────────
pub(crate) const COL_MAX_NUMBER: &str = "max_number";
pub(crate) const COL_CNT: &str = "cnt";
