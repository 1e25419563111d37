//! Types shared by the chainsync crates.
//!
//! This crate holds the checkpoint encoding that orders heterogeneous chain
//! events, the persisted record types, and the raw upstream event shape
//! they are built from.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod block;
pub use block::Block;

mod checkpoint;
pub use checkpoint::{
    BLOCK_NUMBER_DIGITS, BLOCK_TIMESTAMP_DIGITS, CHAIN_ID_DIGITS, CHECKPOINT_LEN, Checkpoint,
    CheckpointField, CheckpointParseError, EVENT_INDEX_DIGITS, EVENT_KIND_DIGITS, EncodingError,
    EventKind, EventPosition, MAX_TRANSACTION_INDEX, TRANSACTION_INDEX_DIGITS, encode_checkpoint,
};

mod decimal;
pub use decimal::{
    DECIMAL_WIDTH, DecimalParseError, hex_to_padded_decimal, pad_decimal, pad_u64,
    parse_padded_decimal, parse_padded_u64,
};

mod log;
pub use log::{Log, log_id};

mod log_filter;
pub use log_filter::LogFilter;

mod raw;
pub use raw::{
    EventRecords, MalformedEvent, RawBlock, RawEvent, RawLog, RawTransaction, RecordError,
};

mod scan;
pub use scan::ScanInterval;

mod transaction;
pub use transaction::{DEFAULT_TX_TYPE, Transaction};
