//! Persistence contract for cached price rows and its implementations.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use pricecache_warehouse::{FetchLogEntry, PriceRow, Warehouse, WarehouseError};
use thiserror::Error;
use time::Date;

use crate::coordinator::GapOutcome;
use crate::{format_date, parse_date, DateRange, InstrumentKey, PriceRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("stored row for {instrument} is invalid: {reason}")]
    InvalidRow { instrument: String, reason: String },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Unavailable(String),
}

/// Per-instrument storage of daily rows keyed by date.
///
/// Implementations must tolerate concurrent callers: each row write is
/// independent and the last write for a date wins.
pub trait RangeStore: Send + Sync {
    /// Creates the instrument partition if it does not exist yet.
    fn ensure_exists(&self, instrument: &InstrumentKey) -> Result<(), StoreError>;

    /// `(min date, max date)` over every stored row, `None` when empty.
    fn covered_extent(&self, instrument: &InstrumentKey) -> Result<Option<DateRange>, StoreError>;

    /// Stored rows inside `range`, ascending by date.
    fn read_range(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, StoreError>;

    /// Insert-or-overwrite by date. Returns the number of dates written.
    ///
    /// On error nothing may be assumed about which rows were written.
    fn upsert_all(
        &self,
        instrument: &InstrumentKey,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError>;

    /// Appends one gap fetch outcome to the store's audit trail, if it keeps one.
    fn record_fetch(
        &self,
        _instrument: &InstrumentKey,
        _outcome: &GapOutcome,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<S: RangeStore + ?Sized> RangeStore for &S {
    fn ensure_exists(&self, instrument: &InstrumentKey) -> Result<(), StoreError> {
        (**self).ensure_exists(instrument)
    }

    fn covered_extent(&self, instrument: &InstrumentKey) -> Result<Option<DateRange>, StoreError> {
        (**self).covered_extent(instrument)
    }

    fn read_range(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        (**self).read_range(instrument, range)
    }

    fn upsert_all(
        &self,
        instrument: &InstrumentKey,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError> {
        (**self).upsert_all(instrument, records)
    }

    fn record_fetch(
        &self,
        instrument: &InstrumentKey,
        outcome: &GapOutcome,
    ) -> Result<(), StoreError> {
        (**self).record_fetch(instrument, outcome)
    }
}

impl<S: RangeStore + ?Sized> RangeStore for Arc<S> {
    fn ensure_exists(&self, instrument: &InstrumentKey) -> Result<(), StoreError> {
        (**self).ensure_exists(instrument)
    }

    fn covered_extent(&self, instrument: &InstrumentKey) -> Result<Option<DateRange>, StoreError> {
        (**self).covered_extent(instrument)
    }

    fn read_range(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        (**self).read_range(instrument, range)
    }

    fn upsert_all(
        &self,
        instrument: &InstrumentKey,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError> {
        (**self).upsert_all(instrument, records)
    }

    fn record_fetch(
        &self,
        instrument: &InstrumentKey,
        outcome: &GapOutcome,
    ) -> Result<(), StoreError> {
        (**self).record_fetch(instrument, outcome)
    }
}

impl RangeStore for Warehouse {
    fn ensure_exists(&self, instrument: &InstrumentKey) -> Result<(), StoreError> {
        self.ensure_instrument(instrument.as_str())?;
        Ok(())
    }

    fn covered_extent(&self, instrument: &InstrumentKey) -> Result<Option<DateRange>, StoreError> {
        let Some((min_date, max_date)) = self.date_extent(instrument.as_str())? else {
            return Ok(None);
        };

        let start = parse_stored_date(instrument, &min_date)?;
        let end = parse_stored_date(instrument, &max_date)?;
        DateRange::new(start, end)
            .map(Some)
            .map_err(|error| invalid_row(instrument, error.to_string()))
    }

    fn read_range(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let rows = self.read_prices(
            instrument.as_str(),
            &format_date(range.start()),
            &format_date(range.end()),
        )?;

        rows.into_iter()
            .map(|row| {
                let date = parse_stored_date(instrument, &row.date)?;
                PriceRecord::new(
                    date,
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.adj_close,
                    row.volume,
                )
                .map_err(|error| invalid_row(instrument, error.to_string()))
            })
            .collect()
    }

    fn upsert_all(
        &self,
        instrument: &InstrumentKey,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError> {
        let rows = records
            .iter()
            .map(|record| PriceRow {
                date: format_date(record.date),
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                adj_close: record.adjusted_close,
                volume: record.volume,
            })
            .collect::<Vec<_>>();

        Ok(self.upsert_prices(instrument.as_str(), &rows)?)
    }

    fn record_fetch(
        &self,
        instrument: &InstrumentKey,
        outcome: &GapOutcome,
    ) -> Result<(), StoreError> {
        Warehouse::record_fetch(
            self,
            &FetchLogEntry {
                instrument: instrument.as_str().to_owned(),
                gap_start: format_date(outcome.gap.start()),
                gap_end: format_date(outcome.gap.end()),
                status: outcome.status.label().to_owned(),
                row_count: outcome.status.stored_rows() as u64,
                message: outcome.status.error_message().map(str::to_owned),
                latency_ms: outcome.latency_ms,
            },
        )?;
        Ok(())
    }
}

fn parse_stored_date(instrument: &InstrumentKey, value: &str) -> Result<Date, StoreError> {
    parse_date(value).map_err(|error| invalid_row(instrument, error.to_string()))
}

fn invalid_row(instrument: &InstrumentKey, reason: String) -> StoreError {
    StoreError::InvalidRow {
        instrument: instrument.as_str().to_owned(),
        reason,
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    partitions: HashMap<InstrumentKey, BTreeMap<Date, PriceRecord>>,
    fetch_log: Vec<(InstrumentKey, GapOutcome)>,
}

/// In-process store; rows are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_partition(&self, instrument: &InstrumentKey) -> bool {
        self.lock()
            .map(|state| state.partitions.contains_key(instrument))
            .unwrap_or(false)
    }

    pub fn row_count(&self, instrument: &InstrumentKey) -> usize {
        self.lock()
            .ok()
            .and_then(|state| state.partitions.get(instrument).map(BTreeMap::len))
            .unwrap_or(0)
    }

    /// Recorded gap outcomes for the instrument, oldest first.
    pub fn fetch_log(&self, instrument: &InstrumentKey) -> Vec<GapOutcome> {
        self.lock()
            .map(|state| {
                state
                    .fetch_log
                    .iter()
                    .filter(|(key, _)| key == instrument)
                    .map(|(_, outcome)| outcome.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RangeStore for MemoryStore {
    fn ensure_exists(&self, instrument: &InstrumentKey) -> Result<(), StoreError> {
        self.lock()?
            .partitions
            .entry(instrument.clone())
            .or_default();
        Ok(())
    }

    fn covered_extent(&self, instrument: &InstrumentKey) -> Result<Option<DateRange>, StoreError> {
        let state = self.lock()?;
        let Some(rows) = state.partitions.get(instrument) else {
            return Ok(None);
        };

        match (rows.keys().next(), rows.keys().next_back()) {
            (Some(start), Some(end)) => Ok(Some(
                DateRange::new(*start, *end)
                    .map_err(|error| invalid_row(instrument, error.to_string()))?,
            )),
            _ => Ok(None),
        }
    }

    fn read_range(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .partitions
            .get(instrument)
            .map(|rows| rows.range(range.start()..=range.end()).map(|(_, row)| *row).collect())
            .unwrap_or_default())
    }

    fn upsert_all(
        &self,
        instrument: &InstrumentKey,
        records: &[PriceRecord],
    ) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        let rows = state.partitions.entry(instrument.clone()).or_default();
        for record in records {
            rows.insert(record.date, *record);
        }
        Ok(records
            .iter()
            .map(|record| record.date)
            .collect::<std::collections::BTreeSet<_>>()
            .len())
    }

    fn record_fetch(
        &self,
        instrument: &InstrumentKey,
        outcome: &GapOutcome,
    ) -> Result<(), StoreError> {
        self.lock()?
            .fetch_log
            .push((instrument.clone(), outcome.clone()));
        Ok(())
    }
}
