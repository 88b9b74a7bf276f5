use pricecache_core::{DateRange, GapOutcome, InstrumentKey, PriceRecord};
use serde::Serialize;

use crate::cli::RangeArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

#[derive(Debug, Serialize)]
struct RangeResponseData<'a> {
    instrument: &'a InstrumentKey,
    range: DateRange,
    records: &'a [PriceRecord],
    gaps: &'a [GapOutcome],
}

pub fn run(args: &RangeArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let instrument = InstrumentKey::parse(&args.instrument)?;
    let requested = DateRange::parse(&args.start, &args.end)?;

    let response = runtime
        .coordinator()
        .get_range_with_report(&instrument, requested)?;

    let data = serde_json::to_value(RangeResponseData {
        instrument: &instrument,
        range: requested,
        records: &response.records,
        gaps: &response.report.gaps,
    })?;

    Ok(CommandResult::ok(data).with_fill(response.report))
}
