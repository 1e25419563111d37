//! Error types for SQL storage.

use chainsync_store::StoreError;

/// SQLite primary result codes that signal lock contention.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// PostgreSQL SQLSTATEs that signal contention: serialization failure,
/// deadlock detected, lock not available.
const PG_CONTENTION_STATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// The database engine behind a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgres,
}

impl DbKind {
    /// Detect the engine from a sqlx backend name.
    pub fn from_backend_name(name: &str) -> Option<Self> {
        match name {
            "SQLite" => Some(Self::Sqlite),
            "PostgreSQL" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Errors that can occur in SQL storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SqlStoreError {
    /// A sqlx database error occurred.
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A data conversion error occurred.
    #[error("conversion error: {0}")]
    Convert(String),
}

impl SqlStoreError {
    /// Whether the error is transient lock or serialization contention on
    /// the given engine.
    pub fn is_contention(&self, kind: DbKind) -> bool {
        let Self::Sqlx(err) = self else { return false };
        match err {
            sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db) => {
                let Some(code) = db.code() else { return false };
                match kind {
                    // Extended result codes carry the primary code in the
                    // low byte.
                    DbKind::Sqlite => code
                        .parse::<i64>()
                        .is_ok_and(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
                    DbKind::Postgres => PG_CONTENTION_STATES.iter().any(|state| *state == code),
                }
            }
            _ => false,
        }
    }

    /// Convert into a [`StoreError`], classifying contention for `kind`.
    pub fn into_store_error(self, kind: DbKind) -> StoreError {
        if self.is_contention(kind) { StoreError::contention(self) } else { self.into() }
    }
}

impl From<SqlStoreError> for StoreError {
    fn from(error: SqlStoreError) -> Self {
        Self::Backend(Box::new(error))
    }
}
