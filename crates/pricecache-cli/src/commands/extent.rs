use pricecache_core::{DateRange, InstrumentKey, RangeStore};
use serde::Serialize;

use crate::cli::ExtentArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

#[derive(Debug, Serialize)]
struct ExtentResponseData {
    instrument: InstrumentKey,
    extent: Option<DateRange>,
}

pub fn run(args: &ExtentArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let instrument = InstrumentKey::parse(&args.instrument)?;
    let extent = runtime.store().covered_extent(&instrument)?;

    let data = serde_json::to_value(ExtentResponseData { instrument, extent })?;
    Ok(CommandResult::ok(data))
}
