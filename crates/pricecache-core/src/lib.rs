//! Core contracts for pricecache.
//!
//! This crate contains:
//! - Validated domain models (instruments, date ranges, daily rows)
//! - Gap resolution between a requested range and cached coverage
//! - The range store contract and its DuckDB and in-memory backings
//! - The fetcher contract, throttling, and a synthetic source
//! - The read-through coordinator and the response envelope

pub mod adapters;
pub mod coordinator;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod fetch_policy;
pub mod fetcher;
pub mod gaps;
pub mod store;
pub mod throttling;

pub use adapters::SyntheticFetcher;
pub use coordinator::{
    CacheFillCoordinator, FillReport, GapOutcome, GapPlan, GapStatus, RangeResponse,
};
pub use domain::{
    format_date, iso_date, parse_date, validate_currency_code, DateRange, InstrumentKey, Period,
    PriceRecord, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::{CacheError, ValidationError};
pub use fetch_policy::{BackoffPolicy, FetchPolicy};
pub use fetcher::{FetchError, FetchErrorKind, Fetcher};
pub use gaps::resolve_gaps;
pub use pricecache_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
pub use store::{MemoryStore, RangeStore, StoreError};
pub use throttling::{Sleeper, ThrottledFetcher, ThrottlingQueue};
