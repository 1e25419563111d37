//! Fixed-width, lexicographically sortable event positions.
//!
//! A [`Checkpoint`] linearizes events of different kinds into one key. Each
//! field of an [`EventPosition`] is rendered as a zero-padded decimal segment
//! and the segments are concatenated in priority order:
//!
//! | Field             | Digits |
//! |-------------------|--------|
//! | chain id          | 16     |
//! | block timestamp   | 10     |
//! | block number      | 16     |
//! | transaction index | 16     |
//! | event kind        | 1      |
//! | event index       | 16     |
//!
//! Because every segment has a fixed width, comparing two checkpoints as
//! strings is the same as comparing their fields numerically, left to right.
//!
//! Block events use [`MAX_TRANSACTION_INDEX`] as their transaction index, so
//! a block's checkpoint sorts after every log and transaction in that block.
//!
//! # Example
//!
//! ```
//! # use chainsync_types::{EventKind, EventPosition};
//! let log = EventPosition::log(8453, 1_700_000_000, 100, 3, 7).encode().unwrap();
//! let block = EventPosition::block(8453, 1_700_000_000, 100).encode().unwrap();
//! assert!(log < block);
//! assert_eq!(block.decode().unwrap().kind, EventKind::Block);
//! ```

use alloy::primitives::U256;
use core::{fmt, str::FromStr};

/// Width of the chain id segment.
pub const CHAIN_ID_DIGITS: usize = 16;
/// Width of the block timestamp segment.
pub const BLOCK_TIMESTAMP_DIGITS: usize = 10;
/// Width of the block number segment.
pub const BLOCK_NUMBER_DIGITS: usize = 16;
/// Width of the transaction index segment.
pub const TRANSACTION_INDEX_DIGITS: usize = 16;
/// Width of the event kind segment.
pub const EVENT_KIND_DIGITS: usize = 1;
/// Width of the event index segment.
pub const EVENT_INDEX_DIGITS: usize = 16;

/// Total length of an encoded checkpoint.
pub const CHECKPOINT_LEN: usize = CHAIN_ID_DIGITS
    + BLOCK_TIMESTAMP_DIGITS
    + BLOCK_NUMBER_DIGITS
    + TRANSACTION_INDEX_DIGITS
    + EVENT_KIND_DIGITS
    + EVENT_INDEX_DIGITS;

/// Transaction index reserved for block events. It is the largest value the
/// transaction index segment can hold.
pub const MAX_TRANSACTION_INDEX: u64 = 9_999_999_999_999_999;

/// The kind of event a checkpoint points at.
///
/// The discriminant is the digit written into the event kind segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// A transaction included in a block.
    Transaction = 2,
    /// A log emitted by a transaction.
    Log = 5,
    /// The block itself.
    Block = 9,
}

impl EventKind {
    /// The digit written into the checkpoint.
    pub const fn digit(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for EventKind {
    type Error = CheckpointParseError;

    fn try_from(digit: u8) -> Result<Self, Self::Error> {
        match digit {
            2 => Ok(Self::Transaction),
            5 => Ok(Self::Log),
            9 => Ok(Self::Block),
            other => Err(CheckpointParseError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction => f.write_str("transaction"),
            Self::Log => f.write_str("log"),
            Self::Block => f.write_str("block"),
        }
    }
}

/// Names the checkpoint segment that failed to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointField {
    /// The chain id segment.
    ChainId,
    /// The block timestamp segment.
    BlockTimestamp,
    /// The block number segment.
    BlockNumber,
    /// The transaction index segment.
    TransactionIndex,
    /// The event index segment.
    EventIndex,
}

impl fmt::Display for CheckpointField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChainId => "chain id",
            Self::BlockTimestamp => "block timestamp",
            Self::BlockNumber => "block number",
            Self::TransactionIndex => "transaction index",
            Self::EventIndex => "event index",
        };
        f.write_str(name)
    }
}

/// A field value did not fit into its checkpoint segment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The value needs more digits than the segment holds.
    #[error("{field} {value} does not fit in {width} digits")]
    Overflow {
        /// The segment that overflowed.
        field: CheckpointField,
        /// The offending value.
        value: U256,
        /// The segment width in digits.
        width: usize,
    },
}

/// A string could not be read back as a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointParseError {
    /// The string has the wrong length.
    #[error("checkpoint must be {CHECKPOINT_LEN} digits, got {0}")]
    Length(usize),
    /// The string contains a non-digit character.
    #[error("checkpoint contains non-digit character {0:?}")]
    NonDigit(char),
    /// The event kind digit does not name a known kind.
    #[error("unknown event kind digit {0}")]
    UnknownKind(u8),
}

/// The six fields that determine an event's global position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPosition {
    /// Chain the event belongs to.
    pub chain_id: U256,
    /// Timestamp of the enclosing block.
    pub block_timestamp: U256,
    /// Number of the enclosing block.
    pub block_number: U256,
    /// Index of the transaction within the block.
    pub transaction_index: U256,
    /// Kind of the event.
    pub kind: EventKind,
    /// Index of the event within its transaction or block.
    pub event_index: U256,
}

impl EventPosition {
    /// Position of a log event.
    pub fn log(
        chain_id: u64,
        block_timestamp: u64,
        block_number: u64,
        transaction_index: u64,
        log_index: u64,
    ) -> Self {
        Self {
            chain_id: U256::from(chain_id),
            block_timestamp: U256::from(block_timestamp),
            block_number: U256::from(block_number),
            transaction_index: U256::from(transaction_index),
            kind: EventKind::Log,
            event_index: U256::from(log_index),
        }
    }

    /// Position of a transaction event.
    pub fn transaction(
        chain_id: u64,
        block_timestamp: u64,
        block_number: u64,
        transaction_index: u64,
    ) -> Self {
        Self {
            chain_id: U256::from(chain_id),
            block_timestamp: U256::from(block_timestamp),
            block_number: U256::from(block_number),
            transaction_index: U256::from(transaction_index),
            kind: EventKind::Transaction,
            event_index: U256::ZERO,
        }
    }

    /// Position of a block event. Uses [`MAX_TRANSACTION_INDEX`] so the block
    /// sorts after everything else it contains.
    pub fn block(chain_id: u64, block_timestamp: u64, block_number: u64) -> Self {
        Self {
            chain_id: U256::from(chain_id),
            block_timestamp: U256::from(block_timestamp),
            block_number: U256::from(block_number),
            transaction_index: U256::from(MAX_TRANSACTION_INDEX),
            kind: EventKind::Block,
            event_index: U256::ZERO,
        }
    }

    /// Encode this position.
    pub fn encode(&self) -> Result<Checkpoint, EncodingError> {
        encode_checkpoint(
            self.chain_id,
            self.block_timestamp,
            self.block_number,
            self.transaction_index,
            self.kind,
            self.event_index,
        )
    }
}

/// Encode the six position fields into a [`Checkpoint`].
///
/// Fails with [`EncodingError::Overflow`] instead of truncating when a value
/// is too wide for its segment.
pub fn encode_checkpoint(
    chain_id: U256,
    block_timestamp: U256,
    block_number: U256,
    transaction_index: U256,
    kind: EventKind,
    event_index: U256,
) -> Result<Checkpoint, EncodingError> {
    let mut out = String::with_capacity(CHECKPOINT_LEN);
    push_segment(&mut out, CheckpointField::ChainId, chain_id, CHAIN_ID_DIGITS)?;
    push_segment(
        &mut out,
        CheckpointField::BlockTimestamp,
        block_timestamp,
        BLOCK_TIMESTAMP_DIGITS,
    )?;
    push_segment(&mut out, CheckpointField::BlockNumber, block_number, BLOCK_NUMBER_DIGITS)?;
    push_segment(
        &mut out,
        CheckpointField::TransactionIndex,
        transaction_index,
        TRANSACTION_INDEX_DIGITS,
    )?;
    out.push(char::from(b'0' + kind.digit()));
    push_segment(&mut out, CheckpointField::EventIndex, event_index, EVENT_INDEX_DIGITS)?;
    debug_assert_eq!(out.len(), CHECKPOINT_LEN);
    Ok(Checkpoint(out))
}

fn push_segment(
    out: &mut String,
    field: CheckpointField,
    value: U256,
    width: usize,
) -> Result<(), EncodingError> {
    let digits = value.to_string();
    if digits.len() > width {
        return Err(EncodingError::Overflow { field, value, width });
    }
    out.push_str(&format!("{digits:0>width$}"));
    Ok(())
}

/// An encoded event position.
///
/// Ordering, equality and hashing are those of the underlying string, which
/// by construction match the ordering of the encoded fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checkpoint(String);

impl Checkpoint {
    /// The smallest possible checkpoint. Everything sorts after it.
    pub fn zero() -> Self {
        Self("0".repeat(CHECKPOINT_LEN))
    }

    /// The largest possible checkpoint. Everything sorts before it.
    pub fn max() -> Self {
        Self("9".repeat(CHECKPOINT_LEN))
    }

    /// The encoded string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the checkpoint back into its fields.
    pub fn decode(&self) -> Result<EventPosition, CheckpointParseError> {
        let mut rest = self.0.as_str();
        let mut take = |width: usize| {
            let (head, tail) = rest.split_at(width);
            rest = tail;
            head
        };
        let chain_id = parse_segment(take(CHAIN_ID_DIGITS));
        let block_timestamp = parse_segment(take(BLOCK_TIMESTAMP_DIGITS));
        let block_number = parse_segment(take(BLOCK_NUMBER_DIGITS));
        let transaction_index = parse_segment(take(TRANSACTION_INDEX_DIGITS));
        let kind_digit = take(EVENT_KIND_DIGITS).as_bytes()[0] - b'0';
        let event_index = parse_segment(take(EVENT_INDEX_DIGITS));

        Ok(EventPosition {
            chain_id,
            block_timestamp,
            block_number,
            transaction_index,
            kind: EventKind::try_from(kind_digit)?,
            event_index,
        })
    }
}

// Segments are validated as ASCII digits no wider than 16, so they always
// fit a U256.
fn parse_segment(digits: &str) -> U256 {
    U256::from_str_radix(digits, 10).unwrap_or_default()
}

impl FromStr for Checkpoint {
    type Err = CheckpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CHECKPOINT_LEN {
            return Err(CheckpointParseError::Length(s.len()));
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(CheckpointParseError::NonDigit(bad));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for Checkpoint {
    type Error = CheckpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Checkpoint> for String {
    fn from(checkpoint: Checkpoint) -> Self {
        checkpoint.0
    }
}

impl AsRef<str> for Checkpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
