use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;

use crate::{DateRange, InstrumentKey, PriceRecord};

/// Fetch-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured failure of one fetch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    retryable: bool,
}

impl FetchError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FetchErrorKind::Unavailable => "fetch.unavailable",
            FetchErrorKind::RateLimited => "fetch.rate_limited",
            FetchErrorKind::InvalidRequest => "fetch.invalid_request",
            FetchErrorKind::Internal => "fetch.internal",
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FetchError {}

/// External source of daily price rows.
///
/// A successful call returns zero or more records dated inside `range`.
/// Records outside the range are dropped by the cache.
pub trait Fetcher: Send + Sync {
    /// Short identifier used in logs and fetch-log entries.
    fn name(&self) -> &str;

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        (**self).fetch(instrument, range)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        (**self).fetch(instrument, range)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        (**self).fetch(instrument, range)
    }
}
