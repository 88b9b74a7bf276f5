use time::{Date, Weekday};

use crate::fetcher::{FetchError, Fetcher};
use crate::{DateRange, InstrumentKey, PriceRecord, ValidationError};

/// Deterministic offline price source.
///
/// Produces one row per trading day (Monday to Friday unless weekends are
/// enabled). Values depend only on the instrument and the date, so refetching
/// a day yields the same row.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFetcher {
    include_weekends: bool,
}

impl SyntheticFetcher {
    pub fn with_weekends() -> Self {
        Self {
            include_weekends: true,
        }
    }

    fn is_trading_day(&self, date: Date) -> bool {
        self.include_weekends || !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
    }
}

impl Fetcher for SyntheticFetcher {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        let seed = instrument_seed(instrument);
        range
            .days()
            .filter(|date| self.is_trading_day(*date))
            .map(|date| {
                let raw = SyntheticBarPayload::generate(seed, date);
                normalize_bar(raw)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct SyntheticBarPayload {
    date: Date,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl SyntheticBarPayload {
    fn generate(seed: u64, date: Date) -> Self {
        let day = u64::from(date.to_julian_day().unsigned_abs());
        let base = 1.0 + (seed % 9_000) as f64 / 100.0;
        let drift = ((day.wrapping_mul(7919) ^ seed) % 200) as f64 / 10_000.0 * base;
        let open = base + drift;
        let close = open + ((day % 7) as f64 - 3.0) / 1_000.0 * base;

        Self {
            date,
            open,
            high: open.max(close) * 1.002,
            low: open.min(close) * 0.998,
            close,
            volume: 0,
        }
    }
}

fn normalize_bar(payload: SyntheticBarPayload) -> Result<PriceRecord, FetchError> {
    PriceRecord::new(
        payload.date,
        payload.open,
        payload.high,
        payload.low,
        payload.close,
        payload.close,
        payload.volume,
    )
    .map_err(validation_to_error)
}

fn instrument_seed(instrument: &InstrumentKey) -> u64 {
    instrument.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

fn validation_to_error(error: ValidationError) -> FetchError {
    FetchError::internal(error.to_string())
}
