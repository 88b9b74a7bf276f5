use pricecache_core::{DateRange, InstrumentKey};

use crate::cli::RangeArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

pub fn run(args: &RangeArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let instrument = InstrumentKey::parse(&args.instrument)?;
    let requested = DateRange::parse(&args.start, &args.end)?;

    let plan = runtime.coordinator().plan(&instrument, requested)?;
    let fully_cached = plan.gaps.is_empty();

    let mut result = CommandResult::ok(serde_json::to_value(plan)?);
    result.cache_hit = fully_cached;
    Ok(result)
}
