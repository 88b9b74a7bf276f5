use pricecache_core::{DateRange, GapOutcome, InstrumentKey, Period, PriceRecord, UtcDateTime};
use serde::Serialize;

use crate::cli::ForexArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

#[derive(Debug, Serialize)]
struct ForexResponseData<'a> {
    instrument: &'a InstrumentKey,
    period: Period,
    range: DateRange,
    records: &'a [PriceRecord],
    gaps: &'a [GapOutcome],
}

pub fn run(args: &ForexArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let instrument = InstrumentKey::currency_pair(&args.from, &args.to)?;
    let today = UtcDateTime::now().date();

    let response = runtime
        .coordinator()
        .get_period(&instrument, args.period, today)?;

    let data = serde_json::to_value(ForexResponseData {
        instrument: &instrument,
        period: args.period,
        range: response.report.requested,
        records: &response.records,
        gaps: &response.report.gaps,
    })?;

    Ok(CommandResult::ok(data)
        .with_fill(response.report)
        .with_warning("rates come from the offline synthetic source"))
}
