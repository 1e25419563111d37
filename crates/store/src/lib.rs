//! Async persistence for checkpoint-ordered chain events.
//!
//! This crate provides an abstraction over the relational store that
//! ingested blocks, transactions and logs land in. The store is optimized
//! for:
//!
//! - **Idempotent batch writes**: re-inserting a known row is a no-op
//! - **Atomic batches**: a batch lands completely or not at all
//! - **Checkpoint-ordered reads** for resuming and paginating consumers
//! - **Scan interval bookkeeping** for resumability
//!
//! # Architecture
//!
//! The store uses a task-based architecture:
//!
//! - [`SyncStore`] trait defines the backend interface
//! - [`WriterTask`] owns the backend and applies requests from a channel
//! - [`WriterHandle`] provides an ergonomic API for sending requests
//!
//! # Example
//!
//! ```ignore
//! use chainsync_store::{WriterConfig, WriterTask, mem::MemStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let (handle, join) =
//!     WriterTask::spawn(MemStore::new(), WriterConfig::default(), CancellationToken::new());
//!
//! handle.dispatch_blocks(blocks).await?;
//! let latest = handle.latest_block().await?;
//! handle.shutdown().await?;
//! join.await??;
//! ```

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

mod error;
pub use error::{StoreError, StoreResult};

mod request;
pub use request::{ReadRequest, Responder, StoreRequest, WriteRequest};

mod retry;
pub use retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};

mod traits;
pub use traits::{SyncStore, TableCounts};

/// Task module containing the writer task and its handle.
pub mod task;
pub use task::{DEFAULT_CHANNEL_CAPACITY, WriterConfig, WriterHandle, WriterTask};

/// Conformance tests for store backends.
#[cfg(any(test, feature = "test-utils"))]
pub mod conformance;

#[cfg(any(test, feature = "in-memory"))]
pub mod mem;
