//! SQL store connector.

use crate::{SqlStore, SqlStoreConfig, SqlStoreError};

/// Errors that can occur when initializing SQL connectors.
#[derive(Debug, thiserror::Error)]
pub enum SqlConnectorError {
    /// Missing environment variable.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Store initialization failed.
    #[error("store initialization failed: {0}")]
    StoreInit(#[from] SqlStoreError),
}

/// Connector for a SQL store (PostgreSQL or SQLite).
///
/// The database type is detected from the URL:
/// - `postgres://` or `postgresql://` use PostgreSQL
/// - `sqlite:` uses SQLite
///
/// # Example
///
/// ```ignore
/// use chainsync_store_sql::SqlConnector;
///
/// let store = SqlConnector::new("sqlite://chainsync.db?mode=rwc").connect().await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqlConnector {
    url: String,
    config: SqlStoreConfig,
}

impl SqlConnector {
    /// Create a new SQL connector with default connection settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), config: SqlStoreConfig::default() }
    }

    /// Override the connection settings.
    pub const fn with_config(mut self, config: SqlStoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the connection URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create a connector from the URL held in an environment variable.
    pub fn from_env(env_var: &'static str) -> Result<Self, SqlConnectorError> {
        let url = std::env::var(env_var).map_err(|_| SqlConnectorError::MissingEnvVar(env_var))?;
        Ok(Self::new(url))
    }

    /// Open the store.
    pub async fn connect(&self) -> Result<SqlStore, SqlConnectorError> {
        Ok(SqlStore::connect_with(&self.url, self.config).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_var() {
        let err = SqlConnector::from_env("CHAINSYNC_TEST_UNSET_DATABASE_URL").unwrap_err();
        assert!(matches!(err, SqlConnectorError::MissingEnvVar(_)));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn connect_memory() {
        let store = SqlConnector::new("sqlite::memory:").connect().await.unwrap();
        assert_eq!(store.kind(), crate::DbKind::Sqlite);
    }
}
