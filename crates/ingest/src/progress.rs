//! Throughput reporting.

use alloy::primitives::BlockNumber;
use std::time::{Duration, Instant};
use tracing::info;

/// Point-in-time ingestion statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Highest block scanned so far.
    pub scanned_to: BlockNumber,
    /// Events received so far.
    pub events: u64,
    /// Time since ingestion started.
    pub elapsed: Duration,
    /// Mean events per second since ingestion started.
    pub events_per_second: f64,
}

/// Tracks cumulative event count and scan position.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    started: Instant,
    events: u64,
    scanned_to: BlockNumber,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Start tracking now.
    pub fn new() -> Self {
        Self { started: Instant::now(), events: 0, scanned_to: 0 }
    }

    /// Record a chunk of `events` that scanned up to `scanned_to`.
    pub fn record(&mut self, events: usize, scanned_to: BlockNumber) {
        self.events += events as u64;
        self.scanned_to = self.scanned_to.max(scanned_to);
    }

    /// Current statistics.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.started.elapsed();
        let seconds = elapsed.as_secs_f64();
        let events_per_second = if seconds > 0.0 { self.events as f64 / seconds } else { 0.0 };
        ProgressSnapshot {
            scanned_to: self.scanned_to,
            events: self.events,
            elapsed,
            events_per_second,
        }
    }

    /// Emit the current statistics as an `info!` line.
    pub fn report(&self) {
        let snapshot = self.snapshot();
        info!(
            scanned_to = snapshot.scanned_to,
            events = snapshot.events,
            elapsed_secs = snapshot.elapsed.as_secs(),
            events_per_second = snapshot.events_per_second.round(),
            "Ingestion progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates() {
        let mut progress = Progress::new();
        progress.record(10, 5);
        progress.record(3, 4);
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.events, 13);
        assert_eq!(snapshot.scanned_to, 5);
        assert!(snapshot.events_per_second >= 0.0);
        progress.report();
    }
}
