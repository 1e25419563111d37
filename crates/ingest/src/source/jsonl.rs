//! Replay of recorded upstream events from a JSON-lines file.

use super::{
    DEFAULT_STREAM_BATCH_SIZE, EventSource, Query, QueryResponse, ReplayStream, SourceError,
    StreamConfig, replay::Replay,
};
use chainsync_types::RawEvent;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::{info, warn};

/// Serves events recorded one JSON object per line.
///
/// Lines that do not parse as a [`RawEvent`] are skipped with a warning.
/// Blank lines are ignored.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    replay: Replay,
    skipped: usize,
}

impl JsonlSource {
    /// Read every event from the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();
        let mut skipped = 0;
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    skipped += 1;
                    warn!(line = number + 1, %err, "Skipping unparseable event");
                }
            }
        }
        info!(path = %path.display(), events = events.len(), skipped, "Loaded event file");
        Ok(Self { replay: Replay::new(events), skipped })
    }

    /// Number of events loaded.
    pub fn len(&self) -> usize {
        self.replay.len()
    }

    /// Whether the file held no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lines skipped because they did not parse.
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

fn parse_line(line: &str) -> Result<RawEvent, SourceError> {
    Ok(serde_json::from_str(line)?)
}

impl EventSource for JsonlSource {
    type Stream = ReplayStream;

    async fn fetch(&self, query: &Query) -> Result<QueryResponse, SourceError> {
        Ok(self.replay.chunk(query, DEFAULT_STREAM_BATCH_SIZE))
    }

    async fn open_stream(
        &self,
        query: Query,
        config: StreamConfig,
    ) -> Result<ReplayStream, SourceError> {
        Ok(ReplayStream::new(self.replay.clone(), query, config.batch_size, None))
    }
}
