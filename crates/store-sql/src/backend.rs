//! Unified SQL backend for the sync store.
//!
//! Supports both PostgreSQL and SQLite via [`sqlx::Any`]. The backend
//! auto-detects the database type at construction time and runs the
//! appropriate schema bootstrap.

use crate::{
    DbKind, SqlStoreError,
    columns::{
        COL_ACCESS_LIST, COL_ADDRESS, COL_BASE_FEE_PER_GAS, COL_BLOCK_HASH, COL_BLOCK_NUMBER,
        COL_BLOCK_TIMESTAMP, COL_CHAIN_ID, COL_CHECKPOINT, COL_CNT, COL_DATA, COL_DIFFICULTY,
        COL_END_BLOCK, COL_EXTRA_DATA, COL_FILTER_ID, COL_FROM_ADDRESS, COL_GAS, COL_GAS_LIMIT,
        COL_GAS_PRICE, COL_GAS_USED, COL_HASH, COL_INPUT, COL_LOG_INDEX, COL_LOGS_BLOOM,
        COL_MAX_FEE_PER_GAS, COL_MAX_NUMBER, COL_MAX_PRIORITY_FEE_PER_GAS, COL_MINER,
        COL_MIX_HASH, COL_NONCE, COL_NUMBER, COL_PARENT_HASH, COL_RECEIPTS_ROOT, COL_SHA3_UNCLES,
        COL_SIG_R, COL_SIG_S, COL_SIG_V, COL_SIZE, COL_START_BLOCK, COL_STATE_ROOT,
        COL_TIMESTAMP, COL_TO_ADDRESS, COL_TOPIC0, COL_TOPIC1, COL_TOPIC2, COL_TOPIC3,
        COL_TOTAL_DIFFICULTY, COL_TRANSACTION_HASH, COL_TRANSACTION_INDEX, COL_TRANSACTIONS_ROOT,
        COL_TX_TYPE, COL_VALUE,
    },
    convert::{
        decode_access_list, decode_hex, decode_topic, decode_u64, decode_u256,
        encode_access_list, encode_hex, encode_topic, encode_u64, encode_u256, from_i64,
        limit_to_i64, to_i64,
    },
};
use alloy::primitives::{B256, BlockNumber};
use chainsync_store::{StoreError, StoreResult, SyncStore, TableCounts};
use chainsync_types::{Block, Checkpoint, Log, ScanInterval, Transaction};
use sqlx::{AnyConnection, AnyPool, Executor, Row, any::AnyRow, pool::PoolOptions};
use std::time::Duration;
use tracing::debug;

/// Default SQLite busy timeout. Writers wait this long for a lock before
/// the engine reports contention.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`SqlStore::connect_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlStoreConfig {
    /// Maximum pooled connections. In-memory SQLite always uses one, so that
    /// every query sees the same database.
    pub max_connections: u32,
    /// SQLite `busy_timeout`, applied to every new connection. Ignored for
    /// PostgreSQL.
    pub busy_timeout: Duration,
}

impl Default for SqlStoreConfig {
    fn default() -> Self {
        Self { max_connections: 1, busy_timeout: DEFAULT_BUSY_TIMEOUT }
    }
}

/// SQL-based store backend.
///
/// Uses [`sqlx::Any`] for database-agnostic access, supporting both
/// PostgreSQL and SQLite through a single implementation. The backend
/// is determined by the connection URL at construction time.
///
/// Every `insert_*` call runs in one transaction and uses
/// `ON CONFLICT DO NOTHING`, so batches are atomic and idempotent.
///
/// # Example
///
/// ```no_run
/// # async fn example() {
/// use chainsync_store_sql::SqlStore;
///
/// // SQLite (in-memory)
/// let store = SqlStore::connect("sqlite::memory:").await.unwrap();
///
/// // PostgreSQL
/// let store = SqlStore::connect("postgres://localhost/chainsync").await.unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: AnyPool,
    kind: DbKind,
}

impl SqlStore {
    /// Create a new SQL store from an existing [`AnyPool`].
    ///
    /// Auto-detects the database backend and creates all tables if they
    /// do not already exist. Callers must ensure
    /// [`sqlx::any::install_default_drivers`] has been called before
    /// constructing the pool.
    pub async fn new(pool: AnyPool) -> Result<Self, SqlStoreError> {
        // Detect backend from a pooled connection.
        let conn = pool.acquire().await?;
        let backend = conn.backend_name().to_owned();
        drop(conn);

        let kind = DbKind::from_backend_name(&backend).ok_or_else(|| {
            SqlStoreError::Convert(format!("unsupported database backend: {backend}"))
        })?;
        let migration = match kind {
            DbKind::Postgres => include_str!("../migrations/001_initial_pg.sql"),
            DbKind::Sqlite => include_str!("../migrations/001_initial.sql"),
        };
        sqlx::raw_sql(migration).execute(&pool).await?;
        debug!(?kind, "Store schema ready");
        Ok(Self { pool, kind })
    }

    /// Connect to a database URL with default settings.
    ///
    /// Installs the default sqlx drivers on the first call. The database
    /// type is inferred from the URL scheme (`sqlite:` or `postgres:`).
    pub async fn connect(url: &str) -> Result<Self, SqlStoreError> {
        Self::connect_with(url, SqlStoreConfig::default()).await
    }

    /// Connect to a database URL.
    ///
    /// SQLite connections get `PRAGMA busy_timeout` from the config as soon
    /// as they are opened.
    pub async fn connect_with(url: &str, config: SqlStoreConfig) -> Result<Self, SqlStoreError> {
        sqlx::any::install_default_drivers();
        let max_connections =
            if url.contains(":memory:") { 1 } else { config.max_connections.max(1) };
        let busy_timeout_ms = config.busy_timeout.as_millis();
        let pool: AnyPool = PoolOptions::new()
            .max_connections(max_connections)
            .after_connect(move |conn, _meta| Box::pin(set_busy_timeout(conn, busy_timeout_ms)))
            .connect(url)
            .await?;
        Self::new(pool).await
    }

    /// The engine behind this store.
    pub const fn kind(&self) -> DbKind {
        self.kind
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    fn store_err(&self, err: impl Into<SqlStoreError>) -> StoreError {
        err.into().into_store_error(self.kind)
    }

    // ========================================================================
    // Write helpers
    // ========================================================================

    async fn write_logs(&self, logs: &[Log]) -> Result<(), SqlStoreError> {
        let mut tx = self.pool.begin().await?;
        for log in logs {
            insert_log(&mut tx, log).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn write_blocks(&self, blocks: &[Block]) -> Result<(), SqlStoreError> {
        let mut tx = self.pool.begin().await?;
        for block in blocks {
            insert_block(&mut tx, block).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn write_transactions(&self, transactions: &[Transaction]) -> Result<(), SqlStoreError> {
        let mut tx = self.pool.begin().await?;
        for transaction in transactions {
            insert_transaction(&mut tx, transaction).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Read helpers
    // ========================================================================

    async fn count(&self, table: &str) -> Result<u64, SqlStoreError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(from_i64(row.try_get(COL_CNT)?))
    }
}

// ============================================================================
// Row → domain type conversion (read path)
// ============================================================================

/// Extract a required TEXT column from a row.
fn text(r: &AnyRow, col: &str) -> Result<String, SqlStoreError> {
    Ok(r.try_get(col)?)
}

/// Extract an INTEGER column from a row.
fn int(r: &AnyRow, col: &str) -> Result<u64, SqlStoreError> {
    Ok(from_i64(r.try_get(col)?))
}

fn checkpoint(r: &AnyRow) -> Result<Checkpoint, SqlStoreError> {
    text(r, COL_CHECKPOINT)?.parse().map_err(|e| SqlStoreError::Convert(format!("{e}")))
}

/// Build a [`Block`] from an [`AnyRow`].
fn block_from_row(r: &AnyRow) -> Result<Block, SqlStoreError> {
    let hex = |col| text(r, col).and_then(|s| decode_hex(&s, col));
    let hex_bytes = |col| text(r, col).and_then(|s| decode_hex(&s, col));
    let u256 = |col| text(r, col).and_then(|s| decode_u256(&s));
    Ok(Block {
        chain_id: int(r, COL_CHAIN_ID)?,
        hash: hex(COL_HASH)?,
        number: decode_u64(&text(r, COL_NUMBER)?)?,
        timestamp: decode_u64(&text(r, COL_TIMESTAMP)?)?,
        parent_hash: hex(COL_PARENT_HASH)?,
        sha3_uncles: hex(COL_SHA3_UNCLES)?,
        miner: decode_hex(&text(r, COL_MINER)?, COL_MINER)?,
        state_root: hex(COL_STATE_ROOT)?,
        transactions_root: hex(COL_TRANSACTIONS_ROOT)?,
        receipts_root: hex(COL_RECEIPTS_ROOT)?,
        logs_bloom: decode_hex(&text(r, COL_LOGS_BLOOM)?, COL_LOGS_BLOOM)?,
        difficulty: u256(COL_DIFFICULTY)?,
        total_difficulty: u256(COL_TOTAL_DIFFICULTY)?,
        gas_limit: u256(COL_GAS_LIMIT)?,
        gas_used: u256(COL_GAS_USED)?,
        size: u256(COL_SIZE)?,
        base_fee_per_gas: u256(COL_BASE_FEE_PER_GAS)?,
        extra_data: hex_bytes(COL_EXTRA_DATA)?,
        mix_hash: hex(COL_MIX_HASH)?,
        nonce: decode_hex(&text(r, COL_NONCE)?, COL_NONCE)?,
        checkpoint: checkpoint(r)?,
    })
}

/// Build a [`Transaction`] from an [`AnyRow`].
fn tx_from_row(r: &AnyRow) -> Result<Transaction, SqlStoreError> {
    let u256 = |col| text(r, col).and_then(|s| decode_u256(&s));
    let to: Option<String> = r.try_get(COL_TO_ADDRESS)?;
    Ok(Transaction {
        chain_id: int(r, COL_CHAIN_ID)?,
        hash: decode_hex(&text(r, COL_HASH)?, COL_HASH)?,
        block_hash: decode_hex(&text(r, COL_BLOCK_HASH)?, COL_BLOCK_HASH)?,
        block_number: decode_u64(&text(r, COL_BLOCK_NUMBER)?)?,
        block_timestamp: decode_u64(&text(r, COL_BLOCK_TIMESTAMP)?)?,
        transaction_index: int(r, COL_TRANSACTION_INDEX)?,
        from: decode_hex(&text(r, COL_FROM_ADDRESS)?, COL_FROM_ADDRESS)?,
        to: to.map(|s| decode_hex(&s, COL_TO_ADDRESS)).transpose()?,
        gas: u256(COL_GAS)?,
        gas_price: u256(COL_GAS_PRICE)?,
        max_fee_per_gas: u256(COL_MAX_FEE_PER_GAS)?,
        max_priority_fee_per_gas: u256(COL_MAX_PRIORITY_FEE_PER_GAS)?,
        nonce: decode_u64(&text(r, COL_NONCE)?)?,
        input: decode_hex(&text(r, COL_INPUT)?, COL_INPUT)?,
        value: u256(COL_VALUE)?,
        tx_type: u8::try_from(int(r, COL_TX_TYPE)?)
            .map_err(|e| SqlStoreError::Convert(format!("column {COL_TX_TYPE}: {e}")))?,
        r: u256(COL_SIG_R)?,
        s: u256(COL_SIG_S)?,
        v: u256(COL_SIG_V)?,
        access_list: decode_access_list(&text(r, COL_ACCESS_LIST)?)?,
        checkpoint: checkpoint(r)?,
    })
}

/// Build a [`Log`] from an [`AnyRow`].
fn log_from_row(r: &AnyRow) -> Result<Log, SqlStoreError> {
    let topic = |col| text(r, col).and_then(|s| decode_topic(&s, col));
    Ok(Log {
        chain_id: int(r, COL_CHAIN_ID)?,
        block_hash: decode_hex(&text(r, COL_BLOCK_HASH)?, COL_BLOCK_HASH)?,
        block_number: decode_u64(&text(r, COL_BLOCK_NUMBER)?)?,
        block_timestamp: decode_u64(&text(r, COL_BLOCK_TIMESTAMP)?)?,
        log_index: int(r, COL_LOG_INDEX)?,
        transaction_hash: decode_hex(&text(r, COL_TRANSACTION_HASH)?, COL_TRANSACTION_HASH)?,
        transaction_index: int(r, COL_TRANSACTION_INDEX)?,
        address: decode_hex(&text(r, COL_ADDRESS)?, COL_ADDRESS)?,
        topic0: decode_hex(&text(r, COL_TOPIC0)?, COL_TOPIC0)?,
        topic1: topic(COL_TOPIC1)?,
        topic2: topic(COL_TOPIC2)?,
        topic3: topic(COL_TOPIC3)?,
        data: decode_hex(&text(r, COL_DATA)?, COL_DATA)?,
        checkpoint: checkpoint(r)?,
    })
}

/// Build a [`ScanInterval`] from an [`AnyRow`].
fn interval_from_row(r: &AnyRow) -> Result<ScanInterval, SqlStoreError> {
    Ok(ScanInterval {
        filter_id: text(r, COL_FILTER_ID)?,
        start_block: decode_u64(&text(r, COL_START_BLOCK)?)?,
        end_block: decode_u64(&text(r, COL_END_BLOCK)?)?,
    })
}

// ============================================================================
// Domain type → SQL INSERT (write path)
// ============================================================================

async fn insert_block(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    block: &Block,
) -> Result<(), SqlStoreError> {
    sqlx::query(
        "INSERT INTO blocks (
            hash, chain_id, number, timestamp, parent_hash, sha3_uncles, miner,
            state_root, transactions_root, receipts_root, logs_bloom, difficulty,
            total_difficulty, gas_limit, gas_used, size, base_fee_per_gas,
            extra_data, mix_hash, nonce, checkpoint
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
            $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
        ) ON CONFLICT DO NOTHING",
    )
    .bind(encode_hex(block.hash))
    .bind(to_i64(block.chain_id))
    .bind(encode_u64(block.number))
    .bind(encode_u64(block.timestamp))
    .bind(encode_hex(block.parent_hash))
    .bind(encode_hex(block.sha3_uncles))
    .bind(encode_hex(block.miner))
    .bind(encode_hex(block.state_root))
    .bind(encode_hex(block.transactions_root))
    .bind(encode_hex(block.receipts_root))
    .bind(encode_hex(block.logs_bloom))
    .bind(encode_u256(&block.difficulty))
    .bind(encode_u256(&block.total_difficulty))
    .bind(encode_u256(&block.gas_limit))
    .bind(encode_u256(&block.gas_used))
    .bind(encode_u256(&block.size))
    .bind(encode_u256(&block.base_fee_per_gas))
    .bind(encode_hex(&block.extra_data))
    .bind(encode_hex(block.mix_hash))
    .bind(encode_hex(block.nonce))
    .bind(block.checkpoint.as_str().to_owned())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    transaction: &Transaction,
) -> Result<(), SqlStoreError> {
    sqlx::query(
        "INSERT INTO transactions (
            hash, chain_id, block_hash, block_number, block_timestamp,
            transaction_index, from_address, to_address, gas, gas_price,
            max_fee_per_gas, max_priority_fee_per_gas, nonce, input, value,
            tx_type, r, s, v, access_list, checkpoint
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
            $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
        ) ON CONFLICT DO NOTHING",
    )
    .bind(encode_hex(transaction.hash))
    .bind(to_i64(transaction.chain_id))
    .bind(encode_hex(transaction.block_hash))
    .bind(encode_u64(transaction.block_number))
    .bind(encode_u64(transaction.block_timestamp))
    .bind(to_i64(transaction.transaction_index))
    .bind(encode_hex(transaction.from))
    .bind(transaction.to.map(encode_hex))
    .bind(encode_u256(&transaction.gas))
    .bind(encode_u256(&transaction.gas_price))
    .bind(encode_u256(&transaction.max_fee_per_gas))
    .bind(encode_u256(&transaction.max_priority_fee_per_gas))
    .bind(encode_u64(transaction.nonce))
    .bind(encode_hex(&transaction.input))
    .bind(encode_u256(&transaction.value))
    .bind(i64::from(transaction.tx_type))
    .bind(encode_u256(&transaction.r))
    .bind(encode_u256(&transaction.s))
    .bind(encode_u256(&transaction.v))
    .bind(encode_access_list(&transaction.access_list)?)
    .bind(transaction.checkpoint.as_str().to_owned())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Apply the SQLite lock wait to a freshly opened connection. Other engines
/// are left untouched.
async fn set_busy_timeout(conn: &mut AnyConnection, timeout_ms: u128) -> Result<(), sqlx::Error> {
    if conn.backend_name() == "SQLite" {
        let pragma = format!("PRAGMA busy_timeout = {timeout_ms}");
        conn.execute(sqlx::raw_sql(&pragma)).await?;
    }
    Ok(())
}

async fn insert_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    log: &Log,
) -> Result<(), SqlStoreError> {
    sqlx::query(
        "INSERT INTO logs (
            id, chain_id, block_hash, block_number, block_timestamp, log_index,
            transaction_hash, transaction_index, address, topic0, topic1, topic2,
            topic3, data, checkpoint
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
        ) ON CONFLICT DO NOTHING",
    )
    .bind(log.id())
    .bind(to_i64(log.chain_id))
    .bind(encode_hex(log.block_hash))
    .bind(encode_u64(log.block_number))
    .bind(encode_u64(log.block_timestamp))
    .bind(to_i64(log.log_index))
    .bind(encode_hex(log.transaction_hash))
    .bind(to_i64(log.transaction_index))
    .bind(encode_hex(log.address))
    .bind(encode_hex(log.topic0))
    .bind(encode_topic(log.topic1))
    .bind(encode_topic(log.topic2))
    .bind(encode_topic(log.topic3))
    .bind(encode_hex(&log.data))
    .bind(log.checkpoint.as_str().to_owned())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ============================================================================
// SyncStore implementation
// ============================================================================

impl SyncStore for SqlStore {
    async fn insert_logs(&self, logs: Vec<Log>) -> StoreResult<()> {
        self.write_logs(&logs).await.map_err(|e| self.store_err(e))
    }

    async fn insert_blocks(&self, blocks: Vec<Block>) -> StoreResult<()> {
        self.write_blocks(&blocks).await.map_err(|e| self.store_err(e))
    }

    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> StoreResult<()> {
        self.write_transactions(&transactions).await.map_err(|e| self.store_err(e))
    }

    async fn insert_scan_interval(&self, interval: ScanInterval) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO scan_intervals (filter_id, start_block, end_block) VALUES ($1, $2, $3)",
        )
        .bind(interval.filter_id)
        .bind(encode_u64(interval.start_block))
        .bind(encode_u64(interval.end_block))
        .execute(&self.pool)
        .await
        .map_err(|e| self.store_err(e))?;
        Ok(())
    }

    async fn latest_block(&self) -> StoreResult<Option<BlockNumber>> {
        let row = sqlx::query("SELECT MAX(number) AS max_number FROM blocks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.store_err(e))?;
        let max: Option<String> = row.try_get(COL_MAX_NUMBER).map_err(|e| self.store_err(e))?;
        Ok(max.map(|s| decode_u64(&s)).transpose()?)
    }

    async fn get_block(&self, hash: B256) -> StoreResult<Option<Block>> {
        let row = sqlx::query("SELECT * FROM blocks WHERE hash = $1")
            .bind(encode_hex(hash))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.store_err(e))?;
        Ok(row.as_ref().map(block_from_row).transpose()?)
    }

    async fn get_transaction(&self, hash: B256) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query("SELECT * FROM transactions WHERE hash = $1")
            .bind(encode_hex(hash))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.store_err(e))?;
        Ok(row.as_ref().map(tx_from_row).transpose()?)
    }

    async fn get_log(&self, id: String) -> StoreResult<Option<Log>> {
        let row = sqlx::query("SELECT * FROM logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.store_err(e))?;
        Ok(row.as_ref().map(log_from_row).transpose()?)
    }

    async fn get_logs_after(&self, checkpoint: Checkpoint, limit: usize) -> StoreResult<Vec<Log>> {
        let rows = sqlx::query(
            "SELECT * FROM logs WHERE checkpoint > $1 ORDER BY checkpoint, id LIMIT $2",
        )
        .bind(checkpoint.as_str().to_owned())
        .bind(limit_to_i64(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.store_err(e))?;
        Ok(rows.iter().map(log_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_scan_intervals(&self, filter_id: String) -> StoreResult<Vec<ScanInterval>> {
        let rows = sqlx::query("SELECT * FROM scan_intervals WHERE filter_id = $1 ORDER BY id")
            .bind(filter_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.store_err(e))?;
        Ok(rows.iter().map(interval_from_row).collect::<Result<_, _>>()?)
    }

    async fn counts(&self) -> StoreResult<TableCounts> {
        let counts = async {
            Ok::<_, SqlStoreError>(TableCounts {
                blocks: self.count("blocks").await?,
                transactions: self.count("transactions").await?,
                logs: self.count("logs").await?,
                scan_intervals: self.count("scan_intervals").await?,
            })
        };
        counts.await.map_err(|e| self.store_err(e))
    }

    async fn close(&self) -> StoreResult<()> {
        self.pool.close().await;
        debug!("Store pool closed");
        Ok(())
    }
}
