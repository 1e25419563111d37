//! SQL backend for the sync store.
//!
//! This crate provides a [`SyncStore`] implementation over relational
//! databases. Every record is stored in decomposed SQL columns, with chain
//! quantities kept as fixed-width decimal text so that numeric order and
//! text order agree.
//!
//! # Supported Databases
//!
//! - **PostgreSQL** (feature `postgres`)
//! - **SQLite** (feature `sqlite`): file-backed or in-memory.
//!
//! # Feature Flags
//!
//! - **`postgres`**: Enables the PostgreSQL driver.
//! - **`sqlite`**: Enables the SQLite driver.
//! - **`test-utils`**: Enables SQLite and propagates
//!   `chainsync-store/test-utils` for conformance testing.
//!
//! [`SyncStore`]: chainsync_store::SyncStore

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
pub use error::{DbKind, SqlStoreError};

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod columns;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod convert;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod backend;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use backend::{DEFAULT_BUSY_TIMEOUT, SqlStore, SqlStoreConfig};

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod connector;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use connector::{SqlConnector, SqlConnectorError};
