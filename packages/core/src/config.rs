/// Configuration for the tree service
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest page size the cascade accepts; a page of one degenerates into a
/// write per node
pub const MIN_CASCADE_BATCH_SIZE: usize = 2;

/// Default number of children flagged per cascade page
pub const DEFAULT_CASCADE_BATCH_SIZE: usize = 64;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value was present but could not be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// A parsed value is outside its allowed range
    #[error("{0}")]
    OutOfRange(String),

    /// A value with no default could not be determined
    #[error("Missing configuration: {0}")]
    Missing(String),
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Tunables for the server-side tree service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeServiceConfig {
    /// Children flagged per cascade page (one transaction per page)
    pub cascade_batch_size: usize,
}

impl Default for TreeServiceConfig {
    fn default() -> Self {
        Self {
            cascade_batch_size: DEFAULT_CASCADE_BATCH_SIZE,
        }
    }
}

impl TreeServiceConfig {
    pub fn with_cascade_batch_size(mut self, size: usize) -> Self {
        self.cascade_batch_size = size;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cascade_batch_size < MIN_CASCADE_BATCH_SIZE {
            return Err(ConfigError::OutOfRange(format!(
                "cascade_batch_size must be at least {}, got {}",
                MIN_CASCADE_BATCH_SIZE, self.cascade_batch_size
            )));
        }
        Ok(())
    }
}
