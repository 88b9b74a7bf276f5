use pricecache_core::{CacheError, StoreError, ValidationError, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("cache storage could not be opened: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("cache storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Cache(CacheError::Validation(_)) => 2,
            Self::Cache(error) if error.is_not_found() => 4,
            Self::Cache(_)
            | Self::Warehouse(_)
            | Self::Store(_)
            | Self::Logging(_)
            | Self::Serialization(_)
            | Self::Io(_) => 10,
        }
    }

    /// Stable code for the error payload of the output envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidRange { .. }) => "cli.invalid_range",
            Self::Validation(_) => "cli.invalid_argument",
            Self::Cache(error) => error.code(),
            Self::Warehouse(_) | Self::Store(_) => "cache.storage_unavailable",
            Self::Logging(_) => "cli.logging",
            Self::Serialization(_) | Self::Io(_) => "cli.output",
        }
    }
}
