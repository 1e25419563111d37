//! Error types for store operations.

/// Result type alias for store operations.
pub type StoreResult<T, E = StoreError> = Result<T, E>;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend is busy or a transaction lost a conflict. Retrying the
    /// whole batch after a delay is expected to succeed.
    #[error("Storage contention: {0}")]
    Contention(Box<dyn core::error::Error + Send + Sync + 'static>),

    /// An error occurred in the storage backend.
    #[error("Backend error: {0}")]
    Backend(#[from] Box<dyn core::error::Error + Send + Sync + 'static>),

    /// A write kept hitting contention until the retry policy gave up.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last contention error.
        #[source]
        source: Box<StoreError>,
    },

    /// The writer task was cancelled or dropped the request.
    #[error("Task cancelled")]
    Cancelled,

    /// Failed to send a request to the writer task.
    ///
    /// The channel is closed because the writer task has terminated, either
    /// after a fatal write error, a cancellation, or a shutdown. The task's
    /// join handle carries the reason.
    #[error("failed to send request to writer task")]
    SendFailed,
}

impl StoreError {
    /// Create a new backend error from any error type.
    pub fn backend<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }

    /// Create a new contention error from any error type.
    pub fn contention<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::Contention(Box::new(error))
    }

    /// Whether retrying the failed operation may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}
