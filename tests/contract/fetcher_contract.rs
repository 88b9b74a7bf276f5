use std::collections::BTreeSet;
use std::sync::Arc;

use pricecache_core::{
    DateRange, FetchPolicy, Fetcher, InstrumentKey, SyntheticFetcher, ThrottledFetcher,
};

#[derive(Clone)]
struct FetcherCase {
    label: &'static str,
    fetcher: Arc<dyn Fetcher>,
    trades_weekends: bool,
}

fn fetcher_cases() -> Vec<FetcherCase> {
    vec![
        FetcherCase {
            label: "synthetic",
            fetcher: Arc::new(SyntheticFetcher::default()),
            trades_weekends: false,
        },
        FetcherCase {
            label: "synthetic-weekends",
            fetcher: Arc::new(SyntheticFetcher::with_weekends()),
            trades_weekends: true,
        },
        FetcherCase {
            label: "throttled-synthetic",
            fetcher: Arc::new(ThrottledFetcher::new(
                SyntheticFetcher::default(),
                &FetchPolicy::unthrottled(),
            )),
            trades_weekends: false,
        },
    ]
}

fn instrument() -> InstrumentKey {
    InstrumentKey::currency_pair("USD", "INR").expect("valid pair")
}

#[test]
fn rows_stay_inside_the_requested_range() {
    let range = DateRange::parse("2024-01-01", "2024-01-31").expect("range");

    for case in fetcher_cases() {
        let rows = case
            .fetcher
            .fetch(&instrument(), range)
            .unwrap_or_else(|error| panic!("fetcher '{}' failed: {error}", case.label));

        assert!(!rows.is_empty(), "fetcher '{}': rows returned", case.label);
        for row in &rows {
            assert!(
                range.contains(row.date),
                "fetcher '{}': {} outside {range}",
                case.label,
                row.date
            );
        }
    }
}

#[test]
fn rows_are_ascending_unique_and_finite() {
    let range = DateRange::parse("2024-02-01", "2024-03-15").expect("range");

    for case in fetcher_cases() {
        let rows = case
            .fetcher
            .fetch(&instrument(), range)
            .unwrap_or_else(|error| panic!("fetcher '{}' failed: {error}", case.label));

        let dates = rows.iter().map(|row| row.date).collect::<BTreeSet<_>>();
        assert_eq!(dates.len(), rows.len(), "fetcher '{}': unique dates", case.label);
        assert!(
            rows.windows(2).all(|pair| pair[0].date < pair[1].date),
            "fetcher '{}': ascending",
            case.label
        );
        for row in &rows {
            assert!(row.validate().is_ok(), "fetcher '{}': finite values", case.label);
            assert!(row.high >= row.low, "fetcher '{}': high >= low", case.label);
        }
    }
}

#[test]
fn weekend_only_range_matches_trading_calendar() {
    // 2024-01-06 is a Saturday.
    let weekend = DateRange::parse("2024-01-06", "2024-01-07").expect("range");

    for case in fetcher_cases() {
        let rows = case
            .fetcher
            .fetch(&instrument(), weekend)
            .unwrap_or_else(|error| panic!("fetcher '{}' failed: {error}", case.label));

        let expected = if case.trades_weekends { 2 } else { 0 };
        assert_eq!(rows.len(), expected, "fetcher '{}': weekend rows", case.label);
    }
}

#[test]
fn refetching_a_range_is_stable() {
    let range = DateRange::parse("2023-12-01", "2023-12-31").expect("range");

    for case in fetcher_cases() {
        let first = case.fetcher.fetch(&instrument(), range).expect("first");
        let second = case.fetcher.fetch(&instrument(), range).expect("second");
        assert_eq!(first, second, "fetcher '{}': deterministic", case.label);
        assert!(!case.fetcher.name().is_empty(), "fetcher '{}': named", case.label);
    }
}
