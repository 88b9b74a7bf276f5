use thiserror::Error;

use crate::store::StoreError;
use crate::{DateRange, InstrumentKey};

/// Validation errors raised before a request reaches the cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("instrument cannot be empty")]
    EmptyInstrument,
    #[error("instrument length {len} exceeds max {max}")]
    InstrumentTooLong { len: usize, max: usize },
    #[error("instrument contains invalid character '{ch}' at index {index}")]
    InstrumentInvalidChar { ch: char, index: usize },

    #[error("currency must be a 3-letter ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
    #[error("date arithmetic left the supported calendar range")]
    DateOutOfRange,

    #[error("invalid period '{value}', expected one of 1W, 1M, 3M, 6M, 1Y")]
    InvalidPeriod { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Failures surfaced by [`crate::CacheFillCoordinator`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    #[error("no data available for {instrument} in {range} ({fetch_failures} failed fetches)")]
    NoDataAvailable {
        instrument: InstrumentKey,
        range: DateRange,
        fetch_failures: usize,
    },
}

impl CacheError {
    /// Stable machine-readable code for envelopes and logs.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidRange { .. }) => "cache.invalid_range",
            Self::Validation(_) => "cache.invalid_request",
            Self::StorageUnavailable(_) => "cache.storage_unavailable",
            Self::NoDataAvailable { .. } => "cache.no_data",
        }
    }

    /// `true` when the outcome is "nothing there" rather than a hard failure.
    ///
    /// A no-data result caused solely by failed fetches with nothing cached
    /// beforehand counts as a failure.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoDataAvailable {
                fetch_failures: 0,
                ..
            }
        )
    }
}
