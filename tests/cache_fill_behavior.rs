//! Behavior-driven tests for the read-through price cache
//!
//! These tests drive the coordinator against a real DuckDB warehouse and
//! verify what a caller observes: rows returned, fetches issued, and what
//! stays cached between calls.

use std::sync::{Arc, Mutex};
use std::thread;

use pricecache_core::{
    CacheError, CacheFillCoordinator, DateRange, FetchError, Fetcher, InstrumentKey, Period,
    PriceRecord, RangeStore, SyntheticFetcher, Warehouse, WarehouseConfig,
};
use tempfile::{tempdir, TempDir};
use time::macros::date;

/// Delegates to the synthetic source and remembers every requested range.
/// Ranges listed in `failing` answer with an upstream error instead.
#[derive(Default)]
struct RecordingFetcher {
    source: SyntheticFetcher,
    calls: Mutex<Vec<DateRange>>,
    failing: Vec<DateRange>,
}

impl RecordingFetcher {
    fn every_day() -> Self {
        Self {
            source: SyntheticFetcher::with_weekends(),
            ..Self::default()
        }
    }

    fn failing_on(mut self, range: DateRange) -> Self {
        self.failing.push(range);
        self
    }

    fn calls(&self) -> Vec<DateRange> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Fetcher for RecordingFetcher {
    fn name(&self) -> &str {
        "recording"
    }

    fn fetch(
        &self,
        instrument: &InstrumentKey,
        range: DateRange,
    ) -> Result<Vec<PriceRecord>, FetchError> {
        self.calls.lock().expect("calls lock").push(range);
        if self.failing.contains(&range) {
            return Err(FetchError::unavailable("upstream returned 503"));
        }
        self.source.fetch(instrument, range)
    }
}

fn open_warehouse(temp: &TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        pricecache_home: temp.path().to_path_buf(),
        db_path: temp.path().join("cache").join("prices.duckdb"),
        max_pool_size: 4,
    })
    .expect("warehouse open")
}

fn usd_inr() -> InstrumentKey {
    InstrumentKey::currency_pair("USD", "INR").expect("valid pair")
}

fn range(start: time::Date, end: time::Date) -> DateRange {
    DateRange::new(start, end).expect("valid range")
}

// =============================================================================
// Cold and warm reads
// =============================================================================

#[test]
fn first_request_fills_the_cache_and_second_is_served_locally() {
    // Given: An empty warehouse
    let temp = tempdir().expect("tempdir");
    let coordinator =
        CacheFillCoordinator::new(open_warehouse(&temp), RecordingFetcher::every_day());
    let requested = range(date!(2024 - 01 - 01), date!(2024 - 01 - 10));

    // When: The same range is requested twice
    let first = coordinator
        .get_range_with_report(&usd_inr(), requested)
        .expect("first read");
    let second = coordinator
        .get_range_with_report(&usd_inr(), requested)
        .expect("second read");

    // Then: Only the first call reaches the source
    assert_eq!(coordinator.fetcher().calls(), vec![requested]);
    assert!(!first.report.cache_hit());
    assert!(second.report.cache_hit());
    assert_eq!(first.records, second.records);
    assert_eq!(first.records.len(), 10);
    assert!(first.records.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[test]
fn cached_rows_survive_a_process_restart() {
    // Given: A range cached by one warehouse handle
    let temp = tempdir().expect("tempdir");
    let requested = range(date!(2024 - 05 - 01), date!(2024 - 05 - 31));
    {
        let coordinator =
            CacheFillCoordinator::new(open_warehouse(&temp), RecordingFetcher::every_day());
        coordinator.get_range(&usd_inr(), requested).expect("fill");
    }

    // When: A fresh handle opens the same file and asks again
    let coordinator =
        CacheFillCoordinator::new(open_warehouse(&temp), RecordingFetcher::every_day());
    let rows = coordinator.get_range(&usd_inr(), requested).expect("read");

    // Then: No fetch is needed
    assert!(coordinator.fetcher().calls().is_empty());
    assert_eq!(rows.len(), 31);
}

#[test]
fn widening_a_request_fetches_only_the_missing_edges() {
    // Given: January 10th to 20th already cached
    let temp = tempdir().expect("tempdir");
    let coordinator =
        CacheFillCoordinator::new(open_warehouse(&temp), RecordingFetcher::every_day());
    coordinator
        .get_range(&usd_inr(), range(date!(2024 - 01 - 10), date!(2024 - 01 - 20)))
        .expect("seed");

    // When: The whole month is requested
    let rows = coordinator
        .get_range(&usd_inr(), range(date!(2024 - 01 - 01), date!(2024 - 01 - 31)))
        .expect("month");

    // Then: Exactly the prefix and suffix were fetched, in order
    assert_eq!(
        coordinator.fetcher().calls()[1..],
        [
            range(date!(2024 - 01 - 01), date!(2024 - 01 - 09)),
            range(date!(2024 - 01 - 21), date!(2024 - 01 - 31)),
        ]
    );
    assert_eq!(rows.len(), 31);
    assert_eq!(
        coordinator.store().covered_extent(&usd_inr()).expect("extent"),
        Some(range(date!(2024 - 01 - 01), date!(2024 - 01 - 31)))
    );
}

#[test]
fn period_request_covers_lookback_window() {
    // Given: A one-month lookback ending on a fixed day
    let temp = tempdir().expect("tempdir");
    let coordinator =
        CacheFillCoordinator::new(open_warehouse(&temp), RecordingFetcher::every_day());

    // When: The period is resolved and served
    let response = coordinator
        .get_period(&usd_inr(), Period::OneMonth, date!(2024 - 03 - 31))
        .expect("period");

    // Then: The window spans 30 days back from the end, both ends included
    assert_eq!(
        response.report.requested,
        range(date!(2024 - 03 - 01), date!(2024 - 03 - 31))
    );
    assert_eq!(response.records.len(), 31);
}

// =============================================================================
// Failure handling
// =============================================================================

#[test]
fn failed_suffix_keeps_prefix_rows_and_logs_the_failure() {
    // Given: Cached coverage in the middle and a source that fails the suffix
    let temp = tempdir().expect("tempdir");
    let suffix = range(date!(2024 - 01 - 11), date!(2024 - 01 - 15));
    let coordinator = CacheFillCoordinator::new(
        open_warehouse(&temp),
        RecordingFetcher::every_day().failing_on(suffix),
    );
    coordinator
        .get_range(&usd_inr(), range(date!(2024 - 01 - 05), date!(2024 - 01 - 10)))
        .expect("seed");

    // When: A wider range is requested
    let response = coordinator
        .get_range_with_report(&usd_inr(), range(date!(2024 - 01 - 01), date!(2024 - 01 - 15)))
        .expect("partial result");

    // Then: Prefix and cached rows come back, suffix dates do not
    let last = response.records.last().map(|row| row.date);
    assert_eq!(response.records.len(), 10);
    assert_eq!(last, Some(date!(2024 - 01 - 10)));
    assert_eq!(response.report.fetch_failures(), 1);

    // And: Every attempt is in the audit trail
    let log = coordinator.store().fetch_log(usd_inr().as_str()).expect("log");
    let statuses = log.iter().map(|entry| entry.status.as_str()).collect::<Vec<_>>();
    assert_eq!(statuses, vec!["filled", "filled", "failed"]);
    assert_eq!(log[2].gap_start, "2024-01-11");
    assert_eq!(log[2].message.as_deref(), Some("upstream returned 503"));
}

#[test]
fn cold_cache_with_failing_source_reports_no_data_as_failure() {
    // Given: No cache and a source that is down
    let temp = tempdir().expect("tempdir");
    let requested = range(date!(2024 - 01 - 01), date!(2024 - 01 - 10));
    let coordinator = CacheFillCoordinator::new(
        open_warehouse(&temp),
        RecordingFetcher::every_day().failing_on(requested),
    );

    // When: The range is requested
    let error = coordinator
        .get_range(&usd_inr(), requested)
        .expect_err("must fail");

    // Then: The caller sees "no data" caused by failed fetches
    assert_eq!(error.code(), "cache.no_data");
    assert!(!error.is_not_found());
    assert!(coordinator
        .store()
        .instrument_exists(usd_inr().as_str())
        .expect("exists"));
}

#[test]
fn weekend_only_range_is_not_found() {
    // Given: A source that only trades on weekdays
    let temp = tempdir().expect("tempdir");
    let coordinator = CacheFillCoordinator::new(open_warehouse(&temp), SyntheticFetcher::default());

    // When: Only a weekend is requested
    let error = coordinator
        .get_range(&usd_inr(), range(date!(2024 - 01 - 06), date!(2024 - 01 - 07)))
        .expect_err("nothing traded");

    // Then: It is a clean not-found, not a failure
    assert!(matches!(
        error,
        CacheError::NoDataAvailable {
            fetch_failures: 0,
            ..
        }
    ));
    assert!(error.is_not_found());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_fills_of_one_instrument_agree() {
    // Given: One warehouse shared by several callers
    let temp = tempdir().expect("tempdir");
    let coordinator = Arc::new(CacheFillCoordinator::new(
        open_warehouse(&temp),
        RecordingFetcher::every_day(),
    ));
    let requested = range(date!(2024 - 06 - 01), date!(2024 - 06 - 30));

    // When: They request the same range at the same time
    let handles = (0..4)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.get_range(&usd_inr(), requested))
        })
        .collect::<Vec<_>>();
    let results = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread").expect("rows"))
        .collect::<Vec<_>>();

    // Then: Duplicate fetches may happen, but every caller sees the same rows
    assert!(!coordinator.fetcher().calls().is_empty());
    for rows in &results {
        assert_eq!(rows, &results[0]);
        assert_eq!(rows.len(), 30);
    }
}
