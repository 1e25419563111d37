//! The stream driver.
//!
//! A single cooperative loop that walks the state machine
//! `Init → CatchingUp → Streaming → Draining → Closed`. It pulls chunks from
//! the upstream source, feeds the batcher, and dispatches full batches to the
//! writer task. Storage latency stays off the receive path: the driver only
//! waits on the writer when the bounded channel is full.

use crate::{
    IngestConfig, IngestError, IngestResult,
    batcher::{Batcher, Batches},
    progress::Progress,
    resume::{Cursor, resume_position},
    source::{EventSource, EventStream, Query, QueryResponse},
};
use alloy::primitives::BlockNumber;
use chainsync_store::{StoreError, StoreResult, SyncStore, WriterHandle, WriterTask};
use core::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Driver states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Looking up the resume position.
    Init,
    /// Running the initial one-shot query.
    CatchingUp,
    /// Receiving chunks from the upstream stream.
    Streaming,
    /// Flushing partial batches.
    Draining,
    /// Finished.
    Closed,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::CatchingUp => write!(f, "catching-up"),
            Self::Streaming => write!(f, "streaming"),
            Self::Draining => write!(f, "draining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events received from upstream.
    pub events: u64,
    /// Malformed events dropped.
    pub dropped: u64,
    /// Highest block scanned.
    pub scanned_to: BlockNumber,
    /// Wall time of the run.
    pub elapsed: Duration,
    /// State the driver stopped in.
    pub final_state: DriverState,
}

/// Ingests events from a source into a store.
///
/// The driver owns two cancellation tokens. Cancelling the
/// [stop token](Self::stop_token) makes the driver drain its partial batches
/// and close cleanly at the next chunk boundary. Cancelling the
/// [writer token](Self::writer_token) stops the writer task between
/// requests, abandoning whatever is still queued.
#[derive(Debug)]
pub struct Driver<S, B> {
    source: S,
    backend: B,
    config: IngestConfig,
    stop: CancellationToken,
    writer_cancel: CancellationToken,
}

impl<S: EventSource, B: SyncStore> Driver<S, B> {
    /// Create a driver.
    pub fn new(source: S, backend: B, config: IngestConfig) -> Self {
        Self {
            source,
            backend,
            config,
            stop: CancellationToken::new(),
            writer_cancel: CancellationToken::new(),
        }
    }

    /// Token that asks the driver to drain and stop.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Token that stops the writer task without draining.
    pub fn writer_token(&self) -> CancellationToken {
        self.writer_cancel.clone()
    }

    /// Run until the source reaches the tip, the stop token fires, or an
    /// error halts ingestion.
    ///
    /// The writer task is always shut down before this returns. When the
    /// writer failed on its own, its error is returned in preference to the
    /// driver's report of a closed channel.
    pub async fn run(self) -> IngestResult<IngestSummary> {
        let Self { source, backend, config, stop, writer_cancel } = self;
        config.validate()?;

        let (writer, join) = WriterTask::spawn(backend, config.writer, writer_cancel);
        let mut run = Run {
            batcher: Batcher::new(config.chain_id(), config.batch_size),
            filter_id: config.filter.id(),
            source,
            writer,
            config,
            stop,
            cursor: Cursor { from_block: 0 },
            progress: Progress::new(),
            state: DriverState::Init,
        };
        let outcome = run.drive().await;
        finish(run.writer, join, outcome).await
    }
}

/// Mutable state of one run.
struct Run<S> {
    source: S,
    writer: WriterHandle,
    config: IngestConfig,
    stop: CancellationToken,
    batcher: Batcher,
    filter_id: String,
    cursor: Cursor,
    progress: Progress,
    state: DriverState,
}

impl<S: EventSource> Run<S> {
    async fn drive(&mut self) -> IngestResult<IngestSummary> {
        loop {
            let next = match self.state {
                DriverState::Init => self.init().await?,
                DriverState::CatchingUp => self.catch_up().await?,
                DriverState::Streaming => self.stream().await?,
                DriverState::Draining => self.drain().await?,
                DriverState::Closed => break,
            };
            if next != self.state {
                debug!(from = %self.state, to = %next, "Driver state change");
            }
            self.state = next;
        }

        let snapshot = self.progress.snapshot();
        Ok(IngestSummary {
            events: snapshot.events,
            dropped: self.batcher.dropped(),
            scanned_to: snapshot.scanned_to,
            elapsed: snapshot.elapsed,
            final_state: self.state,
        })
    }

    async fn init(&mut self) -> IngestResult<DriverState> {
        let resume = resume_position(&self.writer).await?;
        self.cursor = Cursor::resume(resume, self.config.start_block);
        info!(
            resume_position = resume,
            from_block = self.cursor.from_block,
            filter_id = %self.filter_id,
            "Starting ingestion"
        );
        Ok(DriverState::CatchingUp)
    }

    async fn catch_up(&mut self) -> IngestResult<DriverState> {
        let response = self.source.fetch(&self.query()).await?;
        self.ingest_chunk(response).await?;
        if self.stop.is_cancelled() {
            info!("Stop requested, draining");
            return Ok(DriverState::Draining);
        }
        Ok(DriverState::Streaming)
    }

    async fn stream(&mut self) -> IngestResult<DriverState> {
        let mut stream = self.source.open_stream(self.query(), self.config.stream).await?;
        loop {
            let Some(response) = stream.recv().await? else {
                info!(scanned_to = self.cursor.scanned_to(), "Reached the tip");
                return Ok(DriverState::Draining);
            };
            if response.is_tip() {
                info!(scanned_to = self.cursor.scanned_to(), "Reached the tip");
                return Ok(DriverState::Draining);
            }
            self.ingest_chunk(response).await?;
            if self.stop.is_cancelled() {
                info!("Stop requested, draining");
                return Ok(DriverState::Draining);
            }
        }
    }

    async fn drain(&mut self) -> IngestResult<DriverState> {
        let batches = self.batcher.drain();
        self.flush(batches).await?;
        Ok(DriverState::Closed)
    }

    fn query(&self) -> Query {
        Query::new(self.cursor.from_block, self.config.filter.clone())
    }

    /// Feed one chunk to the batcher and hand off whatever filled up.
    async fn ingest_chunk(&mut self, response: QueryResponse) -> IngestResult<()> {
        if self.writer.is_closed() {
            return Err(StoreError::SendFailed.into());
        }
        let QueryResponse { events, next_block } = response;
        let received = events.len();
        self.batcher.extend(events)?;
        self.cursor.advance(next_block);
        self.progress.record(received, self.cursor.scanned_to());

        let batches = self.batcher.take_full();
        self.flush(batches).await?;
        self.progress.report();
        Ok(())
    }

    /// Dispatch batches in write order: logs, then transactions, then
    /// blocks.
    async fn flush(&mut self, batches: Batches) -> StoreResult<()> {
        let Batches { logs, blocks, transactions } = batches;
        if let Some(batch) = logs {
            let interval = batch.interval(self.filter_id.as_str());
            debug!(
                logs = batch.len(),
                start = interval.start_block,
                end = interval.end_block,
                "Flushing logs"
            );
            self.writer.dispatch_logs(batch.into_logs(), Some(interval)).await?;
        }
        if !transactions.is_empty() {
            debug!(transactions = transactions.len(), "Flushing transactions");
            self.writer.dispatch_transactions(transactions).await?;
        }
        if !blocks.is_empty() {
            debug!(blocks = blocks.len(), "Flushing blocks");
            self.writer.dispatch_blocks(blocks).await?;
        }
        Ok(())
    }
}

/// Shut the writer down and reconcile its result with the driver's.
async fn finish(
    writer: WriterHandle,
    join: JoinHandle<StoreResult<()>>,
    outcome: IngestResult<IngestSummary>,
) -> IngestResult<IngestSummary> {
    if let Err(err) = writer.shutdown().await {
        debug!(%err, "Writer already stopped");
    }
    drop(writer);
    let writer_result = join.await.unwrap_or_else(|err| Err(StoreError::backend(err)));

    match (outcome, writer_result) {
        (Ok(summary), Ok(())) => {
            info!(
                events = summary.events,
                dropped = summary.dropped,
                scanned_to = summary.scanned_to,
                "Ingestion finished"
            );
            Ok(summary)
        }
        (Err(err), Err(writer_err)) if err.is_writer_gone() => Err(writer_err.into()),
        (Err(err), writer_result) => {
            if let Err(writer_err) = writer_result {
                warn!(%writer_err, "Writer also failed");
            }
            Err(err)
        }
        (Ok(_), Err(writer_err)) => Err(IngestError::Store(writer_err)),
    }
}
