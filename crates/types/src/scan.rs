//! Scan interval bookkeeping.

use alloy::primitives::BlockNumber;

/// A contiguous block range known to be fully ingested for one log filter.
///
/// Intervals are appended as log batches commit and are never merged or
/// rewritten. They only inform resumption granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanInterval {
    /// Stable identifier of the log filter, see [`LogFilter::id`].
    ///
    /// [`LogFilter::id`]: crate::LogFilter::id
    pub filter_id: String,
    /// First block of the range (inclusive).
    pub start_block: BlockNumber,
    /// Last block of the range (inclusive).
    pub end_block: BlockNumber,
}

impl ScanInterval {
    /// Create a new interval.
    pub fn new(
        filter_id: impl Into<String>,
        start_block: BlockNumber,
        end_block: BlockNumber,
    ) -> Self {
        Self { filter_id: filter_id.into(), start_block, end_block }
    }
}
