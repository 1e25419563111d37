//! Error types for ingestion.

use crate::{config::ConfigError, source::SourceError};
use chainsync_store::StoreError;
use chainsync_types::EncodingError;

/// Result type alias for ingestion.
pub type IngestResult<T, E = IngestError> = Result<T, E>;

/// Reasons ingestion halts.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The upstream source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The store or writer task failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A checkpoint could not be encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Whether the error only reports that the writer task is gone, in which
    /// case the task's own result explains why.
    pub const fn is_writer_gone(&self) -> bool {
        matches!(self, Self::Store(StoreError::SendFailed | StoreError::Cancelled))
    }
}
