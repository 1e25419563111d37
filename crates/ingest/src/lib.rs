//! Checkpoint-ordered event ingestion.
//!
//! The [`Driver`] pulls raw events from an upstream [`EventSource`], turns
//! them into deduplicated block, transaction and log batches with the
//! [`Batcher`], and hands full batches to a store writer task. On restart it
//! resumes strictly after the highest persisted block.
//!
//! # Feature Flags
//!
//! - **`test-utils`**: Enables the in-memory [`MemSource`] and raw event
//!   fixtures.
//!
//! [`EventSource`]: source::EventSource
//! [`MemSource`]: source::MemSource

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

pub mod batcher;
pub use batcher::{Batcher, Batches, DEFAULT_BATCH_SIZE, LogBatch};

pub mod config;
pub use config::{ConfigError, IngestConfig};

mod driver;
pub use driver::{Driver, DriverState, IngestSummary};

mod error;
pub use error::{IngestError, IngestResult};

mod progress;
pub use progress::{Progress, ProgressSnapshot};

mod resume;
pub use resume::{Cursor, resume_position};

pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Used by the binary only.
use anyhow as _;
use chainsync_store_sql as _;
use clap as _;
use tracing_subscriber as _;
