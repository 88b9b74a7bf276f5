//! Read-through fill of missing date ranges.

use std::time::Instant;

use serde::Serialize;
use time::Date;

use crate::error::CacheError;
use crate::fetcher::{FetchError, Fetcher};
use crate::gaps::resolve_gaps;
use crate::store::RangeStore;
use crate::{DateRange, InstrumentKey, Period, PriceRecord};

/// What happened to one gap during a fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GapStatus {
    Filled {
        fetched: usize,
        stored: usize,
        discarded: usize,
    },
    /// The source answered but had nothing usable for the gap.
    Empty { discarded: usize },
    Failed {
        code: String,
        message: String,
        retryable: bool,
    },
}

impl GapStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Filled { .. } => "filled",
            Self::Empty { .. } => "empty",
            Self::Failed { .. } => "failed",
        }
    }

    pub const fn stored_rows(&self) -> usize {
        match self {
            Self::Filled { stored, .. } => *stored,
            Self::Empty { .. } | Self::Failed { .. } => 0,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            Self::Filled { .. } | Self::Empty { .. } => None,
        }
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn from_fetch_error(error: &FetchError) -> Self {
        Self::Failed {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapOutcome {
    pub gap: DateRange,
    #[serde(flatten)]
    pub status: GapStatus,
    pub latency_ms: u64,
}

/// Trace of a single `get_range` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub instrument: InstrumentKey,
    pub requested: DateRange,
    pub extent_before: Option<DateRange>,
    pub extent_after: Option<DateRange>,
    pub gaps: Vec<GapOutcome>,
}

impl FillReport {
    /// `true` when the request was answered entirely from storage.
    pub fn cache_hit(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn fetch_failures(&self) -> usize {
        self.gaps.iter().filter(|gap| gap.status.is_failure()).count()
    }

    pub fn rows_stored(&self) -> usize {
        self.gaps.iter().map(|gap| gap.status.stored_rows()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeResponse {
    pub records: Vec<PriceRecord>,
    pub report: FillReport,
}

/// Gaps that a fill would fetch, without fetching them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapPlan {
    pub instrument: InstrumentKey,
    pub requested: DateRange,
    pub extent: Option<DateRange>,
    pub gaps: Vec<DateRange>,
}

/// Answers range reads from the store, fetching only the dates it lacks.
///
/// Gaps are fetched one after another in chronological order. A failed
/// fetch is recorded and skipped; a storage failure aborts the call.
pub struct CacheFillCoordinator<S, F> {
    store: S,
    fetcher: F,
}

impl<S: RangeStore, F: Fetcher> CacheFillCoordinator<S, F> {
    pub fn new(store: S, fetcher: F) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Ordered rows for `requested`, filling uncovered edges first.
    pub fn get_range(
        &self,
        instrument: &InstrumentKey,
        requested: DateRange,
    ) -> Result<Vec<PriceRecord>, CacheError> {
        self.get_range_with_report(instrument, requested)
            .map(|response| response.records)
    }

    /// Rows for the `period` window that ends on `end`.
    pub fn get_period(
        &self,
        instrument: &InstrumentKey,
        period: Period,
        end: Date,
    ) -> Result<RangeResponse, CacheError> {
        let requested = period.range_ending(end)?;
        self.get_range_with_report(instrument, requested)
    }

    pub fn get_range_with_report(
        &self,
        instrument: &InstrumentKey,
        requested: DateRange,
    ) -> Result<RangeResponse, CacheError> {
        let span = tracing::info_span!(
            "get_range",
            %instrument,
            start = %crate::format_date(requested.start()),
            end = %crate::format_date(requested.end()),
        );
        let _entered = span.enter();

        self.store.ensure_exists(instrument)?;
        let extent_before = self.store.covered_extent(instrument)?;
        let gaps = resolve_gaps(requested, extent_before);
        tracing::debug!(
            extent = ?extent_before.map(|extent| extent.to_string()),
            gaps = gaps.len(),
            "resolved gaps"
        );

        let mut outcomes = Vec::with_capacity(gaps.len());
        for gap in gaps {
            let outcome = self.fill_gap(instrument, gap)?;
            if let Err(error) = self.store.record_fetch(instrument, &outcome) {
                tracing::warn!(%gap, error = %error, "could not record fetch outcome");
            }
            outcomes.push(outcome);
        }

        let fetch_failures = outcomes
            .iter()
            .filter(|outcome| outcome.status.is_failure())
            .count();
        let any_answered = outcomes.len() > fetch_failures;
        if extent_before.is_none() && !outcomes.is_empty() && !any_answered {
            tracing::warn!(fetch_failures, "every fetch failed and nothing was cached");
            return Err(CacheError::NoDataAvailable {
                instrument: instrument.clone(),
                range: requested,
                fetch_failures,
            });
        }

        let records = self.store.read_range(instrument, requested)?;
        if records.is_empty() {
            tracing::info!(fetch_failures, "no rows in requested range");
            return Err(CacheError::NoDataAvailable {
                instrument: instrument.clone(),
                range: requested,
                fetch_failures,
            });
        }

        let extent_after = self.store.covered_extent(instrument)?;
        let report = FillReport {
            instrument: instrument.clone(),
            requested,
            extent_before,
            extent_after,
            gaps: outcomes,
        };
        tracing::info!(
            rows = records.len(),
            cache_hit = report.cache_hit(),
            stored = report.rows_stored(),
            fetch_failures,
            "range served"
        );

        Ok(RangeResponse { records, report })
    }

    /// Resolves gaps against current coverage without fetching or writing.
    pub fn plan(
        &self,
        instrument: &InstrumentKey,
        requested: DateRange,
    ) -> Result<GapPlan, CacheError> {
        let extent = self.store.covered_extent(instrument)?;
        Ok(GapPlan {
            instrument: instrument.clone(),
            requested,
            extent,
            gaps: resolve_gaps(requested, extent),
        })
    }

    fn fill_gap(
        &self,
        instrument: &InstrumentKey,
        gap: DateRange,
    ) -> Result<GapOutcome, CacheError> {
        let started = Instant::now();
        let fetched = self.fetcher.fetch(instrument, gap);
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let records = match fetched {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(
                    fetcher = self.fetcher.name(),
                    %gap,
                    code = error.code(),
                    error = %error,
                    "gap fetch failed"
                );
                return Ok(GapOutcome {
                    gap,
                    status: GapStatus::from_fetch_error(&error),
                    latency_ms,
                });
            }
        };

        let fetched_count = records.len();
        let accepted = records
            .into_iter()
            .filter(|record| gap.contains(record.date) && record.validate().is_ok())
            .collect::<Vec<_>>();
        let discarded = fetched_count - accepted.len();
        if discarded > 0 {
            tracing::warn!(
                %gap,
                discarded,
                "dropped fetched rows outside the gap or with invalid values"
            );
        }

        let status = if accepted.is_empty() {
            tracing::debug!(%gap, "source returned no rows for gap");
            GapStatus::Empty { discarded }
        } else {
            let stored = self.store.upsert_all(instrument, &accepted)?;
            tracing::debug!(%gap, stored, "gap filled");
            GapStatus::Filled {
                fetched: fetched_count,
                stored,
                discarded,
            }
        };

        Ok(GapOutcome {
            gap,
            status,
            latency_ms,
        })
    }
}
