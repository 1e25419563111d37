//! Ingestion configuration and environment parsing.
//!
//! # Environment Variables
//!
//! | Variable | Description | Required |
//! |----------|-------------|----------|
//! | `CHAINSYNC_CHAIN_ID` | Chain the filter applies to | Yes |
//! | `CHAINSYNC_ADDRESSES` | Comma-separated emitting contracts | No |
//! | `CHAINSYNC_TOPIC0` | Comma-separated topic0 values | No |
//! | `CHAINSYNC_BATCH_SIZE` | Flush threshold per collection | No |
//! | `CHAINSYNC_START_BLOCK` | Lowest block to request | No |
//! | `CHAINSYNC_CHANNEL_CAPACITY` | Writer channel capacity | No |

use crate::{batcher::DEFAULT_BATCH_SIZE, source::StreamConfig};
use alloy::primitives::{Address, B256, BlockNumber};
use chainsync_store::WriterConfig;
use chainsync_types::LogFilter;
use std::{env, str::FromStr};

/// Environment variable name for the chain id.
pub const ENV_CHAIN_ID: &str = "CHAINSYNC_CHAIN_ID";

/// Environment variable name for the address filter.
pub const ENV_ADDRESSES: &str = "CHAINSYNC_ADDRESSES";

/// Environment variable name for the topic0 filter.
pub const ENV_TOPIC0: &str = "CHAINSYNC_TOPIC0";

/// Environment variable name for the flush threshold.
pub const ENV_BATCH_SIZE: &str = "CHAINSYNC_BATCH_SIZE";

/// Environment variable name for the start block.
pub const ENV_START_BLOCK: &str = "CHAINSYNC_START_BLOCK";

/// Environment variable name for the writer channel capacity.
pub const ENV_CHANNEL_CAPACITY: &str = "CHAINSYNC_CHANNEL_CAPACITY";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// An environment variable holds an unparseable value.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// The variable name.
        var: &'static str,
        /// The offending value.
        value: String,
    },

    /// A size setting is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Everything the driver needs besides its source and store.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Which logs to ingest. Its chain id stamps every record.
    pub filter: LogFilter,
    /// Flush threshold per collection.
    pub batch_size: usize,
    /// Lowest block to request, whatever the resume position.
    pub start_block: BlockNumber,
    /// Upstream stream parameters.
    pub stream: StreamConfig,
    /// Writer task parameters.
    pub writer: WriterConfig,
}

impl IngestConfig {
    /// Default settings for `filter`.
    pub fn new(filter: LogFilter) -> Self {
        Self {
            filter,
            batch_size: DEFAULT_BATCH_SIZE,
            start_block: 0,
            stream: StreamConfig::default(),
            writer: WriterConfig::default(),
        }
    }

    /// Set the flush threshold.
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the lowest block to request.
    pub const fn with_start_block(mut self, start_block: BlockNumber) -> Self {
        self.start_block = start_block;
        self
    }

    /// Set the upstream stream parameters.
    pub const fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// Set the writer task parameters.
    pub const fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    /// The chain being ingested.
    pub const fn chain_id(&self) -> u64 {
        self.filter.chain_id
    }

    /// Check the size settings.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch size"));
        }
        if self.writer.channel_capacity == 0 {
            return Err(ConfigError::Zero("channel capacity"));
        }
        Ok(())
    }

    /// Load the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if the chain id is not set, or
    /// [`ConfigError::InvalidValue`] if any variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chain_id =
            env::var(ENV_CHAIN_ID).map_err(|_| ConfigError::MissingEnvVar(ENV_CHAIN_ID))?;
        let mut filter = LogFilter::new(parse_var(ENV_CHAIN_ID, &chain_id)?);
        if let Some(addresses) = optional_list::<Address>(ENV_ADDRESSES)? {
            filter = filter.with_addresses(addresses);
        }
        if let Some(topics) = optional_list::<B256>(ENV_TOPIC0)? {
            filter = filter.with_topic(0, topics);
        }

        let mut config = Self::new(filter);
        if let Some(batch_size) = optional(ENV_BATCH_SIZE)? {
            config.batch_size = batch_size;
        }
        if let Some(start_block) = optional(ENV_START_BLOCK)? {
            config.start_block = start_block;
        }
        if let Some(capacity) = optional(ENV_CHANNEL_CAPACITY)? {
            config.writer.channel_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue { var, value: value.to_owned() })
}

fn optional<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    env::var(var).ok().map(|value| parse_var(var, &value)).transpose()
}

fn optional_list<T: FromStr>(var: &'static str) -> Result<Option<Vec<T>>, ConfigError> {
    let Ok(value) = env::var(var) else { return Ok(None) };
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| parse_var(var, item))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
