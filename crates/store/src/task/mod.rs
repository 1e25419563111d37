//! Writer task and handle.
//!
//! - [`WriterTask`] owns the backend and applies requests from a channel
//! - [`WriterHandle`] sends requests to the task

mod handle;
pub use handle::WriterHandle;

mod runner;
pub use runner::{DEFAULT_CHANNEL_CAPACITY, WriterConfig, WriterTask};
