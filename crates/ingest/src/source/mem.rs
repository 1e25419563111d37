//! In-memory event source for tests.

use super::{
    DEFAULT_STREAM_BATCH_SIZE, EventSource, Query, QueryResponse, ReplayStream, SourceError,
    StreamConfig, replay::Replay,
};
use chainsync_types::RawEvent;

/// Serves a fixed list of events in block order.
///
/// Queries are filtered and chunked like a live upstream. Streams can be set
/// to fail with [`SourceError::Interrupted`] after a number of chunks.
#[derive(Debug, Clone, Default)]
pub struct MemSource {
    replay: Replay,
    fetch_limit: usize,
    interrupt_after: Option<usize>,
}

impl MemSource {
    /// Create a source over `events`.
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            replay: Replay::new(events),
            fetch_limit: DEFAULT_STREAM_BATCH_SIZE,
            interrupt_after: None,
        }
    }

    /// Limit the number of events returned by [`EventSource::fetch`].
    pub const fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    /// Make every stream fail after delivering `chunks` chunks.
    pub const fn interrupt_after(mut self, chunks: usize) -> Self {
        self.interrupt_after = Some(chunks);
        self
    }
}

impl EventSource for MemSource {
    type Stream = ReplayStream;

    async fn fetch(&self, query: &Query) -> Result<QueryResponse, SourceError> {
        Ok(self.replay.chunk(query, self.fetch_limit))
    }

    async fn open_stream(
        &self,
        query: Query,
        config: StreamConfig,
    ) -> Result<ReplayStream, SourceError> {
        Ok(ReplayStream::new(self.replay.clone(), query, config.batch_size, self.interrupt_after))
    }
}
