//! Interval arithmetic between a requested range and the cached extent.

use crate::DateRange;

/// Parts of `requested` not covered by `extent`, in chronological order.
///
/// Coverage is a single contiguous extent, so there are at most two gaps: one
/// before the extent and one after it. Holes inside the extent are invisible
/// here.
pub fn resolve_gaps(requested: DateRange, extent: Option<DateRange>) -> Vec<DateRange> {
    let Some(extent) = extent else {
        return vec![requested];
    };

    let mut gaps = Vec::with_capacity(2);

    if requested.start() < extent.start() {
        // Extent start is strictly after requested.start, so previous_day exists.
        let before_extent = extent.start().previous_day().unwrap_or(requested.start());
        let end = before_extent.min(requested.end());
        gaps.push(bounded(requested.start(), end));
    }

    if extent.end() < requested.end() {
        let after_extent = extent.end().next_day().unwrap_or(requested.end());
        let start = after_extent.max(requested.start());
        gaps.push(bounded(start, requested.end()));
    }

    gaps
}

fn bounded(start: time::Date, end: time::Date) -> DateRange {
    DateRange::new(start, end).unwrap_or_else(|_| DateRange::single_day(start))
}
