//! # Domain Models
//!
//! Validated value types shared by the cache, the stores and the fetchers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`InstrumentKey`] | Storage-safe identifier of one time series |
//! | [`DateRange`] | Inclusive calendar interval, `start <= end` |
//! | [`PriceRecord`] | Daily OHLCV row |
//! | [`Period`] | Lookback token (`1W`, `1M`, `3M`, `6M`, `1Y`) |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates every invariant, so a value of one of these types
//! is always usable as-is:
//!
//! ```rust
//! use pricecache_core::{DateRange, ValidationError};
//!
//! let reversed = DateRange::parse("2024-02-01", "2024-01-01");
//! assert!(matches!(reversed, Err(ValidationError::InvalidRange { .. })));
//! ```

mod date_range;
mod instrument;
mod period;
mod price_record;
mod timestamp;

pub use date_range::{format_date, iso_date, parse_date, DateRange};
pub use instrument::{validate_currency_code, InstrumentKey};
pub use period::Period;
pub use price_record::PriceRecord;
pub use timestamp::UtcDateTime;
