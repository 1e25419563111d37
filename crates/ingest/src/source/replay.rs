//! Chunked replay over a fixed, block-ordered event list.

use super::{EventStream, Query, QueryResponse, SourceError};
use alloy::primitives::BlockNumber;
use chainsync_types::RawEvent;
use std::sync::Arc;

/// Events held in memory, shared between a source and its streams.
///
/// Events are kept sorted by block. An event without a block number takes
/// the block of the event before it (or after it, at the head of the list),
/// so it is delivered once, next to its neighbours, and rejected downstream.
#[derive(Debug, Clone, Default)]
pub(crate) struct Replay {
    events: Arc<[RawEvent]>,
    blocks: Arc<[BlockNumber]>,
}

impl Replay {
    pub(crate) fn new(events: Vec<RawEvent>) -> Self {
        let mut current = events.iter().find_map(RawEvent::block_number).unwrap_or_default();
        let mut placed: Vec<(BlockNumber, RawEvent)> = events
            .into_iter()
            .map(|event| {
                current = event.block_number().unwrap_or(current);
                (current, event)
            })
            .collect();
        placed.sort_by_key(|(block, _)| *block);
        let (blocks, events): (Vec<_>, Vec<_>) = placed.into_iter().unzip();
        Self { events: events.into(), blocks: blocks.into() }
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// The next chunk of events matching `query`.
    ///
    /// Chunks end on block boundaries, so a block's events are never split
    /// across two chunks. A chunk exceeds `limit` only when a single block
    /// holds more than `limit` events.
    pub(crate) fn chunk(&self, query: &Query, limit: usize) -> QueryResponse {
        let limit = limit.max(1);
        let start = self.blocks.partition_point(|block| *block < query.from_block);
        let mut events: Vec<RawEvent> = Vec::new();
        let mut last_block = None;
        for (event, block) in self.events[start..].iter().zip(&self.blocks[start..]) {
            if !query.matches(event) {
                continue;
            }
            if events.len() >= limit && last_block != Some(*block) {
                break;
            }
            last_block = Some(*block);
            events.push(event.clone());
        }
        let next_block = last_block.map(|n| n + 1);
        QueryResponse { events, next_block }
    }
}

/// Stream over a [`Replay`], optionally breaking off after a number of
/// chunks.
#[derive(Debug)]
pub struct ReplayStream {
    replay: Replay,
    query: Query,
    batch_size: usize,
    delivered: usize,
    interrupt_after: Option<usize>,
}

impl ReplayStream {
    pub(crate) const fn new(
        replay: Replay,
        query: Query,
        batch_size: usize,
        interrupt_after: Option<usize>,
    ) -> Self {
        Self { replay, query, batch_size, delivered: 0, interrupt_after }
    }

    /// Number of chunks delivered so far.
    pub const fn delivered(&self) -> usize {
        self.delivered
    }
}

impl EventStream for ReplayStream {
    async fn recv(&mut self) -> Result<Option<QueryResponse>, SourceError> {
        if self.interrupt_after.is_some_and(|n| self.delivered >= n) {
            return Err(SourceError::Interrupted(format!(
                "connection dropped after {} chunks",
                self.delivered
            )));
        }
        let chunk = self.replay.chunk(&self.query, self.batch_size);
        if chunk.events.is_empty() {
            return Ok(None);
        }
        if let Some(next) = chunk.next_block {
            self.query.from_block = next;
        }
        self.delivered += 1;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::raw_event;
    use chainsync_types::LogFilter;

    fn replay() -> Replay {
        // Blocks 1..=4 with two events each, plus a lone event in block 6.
        let mut events: Vec<_> =
            (1..=4).flat_map(|n| [raw_event(n, 0, 0), raw_event(n, 0, 1)]).collect();
        events.push(raw_event(6, 0, 0));
        Replay::new(events)
    }

    #[test]
    fn chunks_end_on_block_boundaries() {
        let replay = replay();
        let chunk = replay.chunk(&Query::new(1, LogFilter::new(1)), 3);
        assert_eq!(chunk.events.len(), 4);
        assert_eq!(chunk.next_block, Some(3));

        let chunk = replay.chunk(&Query::new(5, LogFilter::new(1)), 3);
        assert_eq!(chunk.events.len(), 1);
        assert_eq!(chunk.next_block, Some(7));

        let chunk = replay.chunk(&Query::new(7, LogFilter::new(1)), 3);
        assert!(chunk.is_tip());
    }

    #[test]
    fn numberless_events_ride_with_their_neighbours() {
        let mut events = vec![raw_event(1, 0, 0), raw_event(2, 0, 0), raw_event(3, 0, 0)];
        events[1].block.number = None;
        events[1].log.block_number = None;
        let replay = Replay::new(events);

        let chunk = replay.chunk(&Query::new(1, LogFilter::new(1)), 2);
        assert_eq!(chunk.events.len(), 2);
        assert_eq!(chunk.events[1].block_number(), None);
        assert_eq!(chunk.next_block, Some(2));

        // Not redelivered once the cursor moves past its block.
        let chunk = replay.chunk(&Query::new(2, LogFilter::new(1)), 2);
        assert_eq!(chunk.events.len(), 1);
        assert_eq!(chunk.next_block, Some(4));
    }

    #[test]
    fn unordered_input_is_sorted_by_block() {
        let replay = Replay::new(vec![raw_event(5, 0, 0), raw_event(2, 0, 0), raw_event(9, 0, 0)]);
        let chunk = replay.chunk(&Query::new(3, LogFilter::new(1)), 10);
        let numbers: Vec<_> = chunk.events.iter().filter_map(RawEvent::block_number).collect();
        assert_eq!(numbers, vec![5, 9]);
    }

    #[tokio::test]
    async fn stream_walks_to_tip() {
        let mut stream = ReplayStream::new(replay(), Query::new(1, LogFilter::new(1)), 4, None);
        let mut total = 0;
        while let Some(chunk) = stream.recv().await.unwrap() {
            total += chunk.events.len();
        }
        assert_eq!(total, replay().len());
        assert_eq!(stream.delivered(), 3);
    }

    #[tokio::test]
    async fn stream_interrupts() {
        let mut stream = ReplayStream::new(replay(), Query::new(1, LogFilter::new(1)), 2, Some(1));
        assert!(stream.recv().await.unwrap().is_some());
        assert!(matches!(stream.recv().await, Err(SourceError::Interrupted(_))));
    }
}
