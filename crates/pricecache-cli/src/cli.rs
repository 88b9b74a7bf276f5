//! CLI argument definitions for pricecache.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `forex` | Daily rates for a currency pair over a lookback period |
//! | `range` | Daily rows for an instrument between two dates |
//! | `extent` | First and last cached date for an instrument |
//! | `gaps` | Date ranges a read would fetch, without fetching |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--db-path` | `$PRICECACHE_HOME/cache/prices.duckdb` | DuckDB cache file |
//! | `--ephemeral` | `false` | Keep the cache in memory for this run only |
//! | `--quota-limit` | `5` | Fetches allowed per quota window |
//! | `--quota-window-secs` | `60` | Length of the quota window, at most one year |
//! | `--log-level` | `warn` | Log filter, overridden by `PRICECACHE_LOG` |
//! | `--log-format` | `text` | Log format on stderr (text, json) |
//!
//! # Examples
//!
//! ```bash
//! pricecache forex --from USD --to INR --period 1M --pretty
//! pricecache range EURUSD --start 2024-01-01 --end 2024-03-31
//! pricecache gaps EURUSD --start 2023-12-01 --end 2024-04-30
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pricecache_core::Period;

#[derive(Debug, Parser)]
#[command(
    name = "pricecache",
    author,
    version,
    about = "Range-aware local cache for daily price series",
    long_about = "pricecache answers daily OHLCV range queries from a local DuckDB cache and \
fetches only the dates the cache does not cover yet.\n\
\n\
Use 'pricecache <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// DuckDB cache file. Defaults to `PRICECACHE_DB_PATH`, then
    /// `$PRICECACHE_HOME/cache/prices.duckdb`.
    #[arg(long, global = true, conflicts_with = "ephemeral")]
    pub db_path: Option<PathBuf>,

    /// Use an in-memory cache that is discarded on exit.
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    /// Upstream fetches allowed per quota window.
    #[arg(long, global = true, default_value_t = 5)]
    pub quota_limit: u32,

    /// Length of the upstream quota window in seconds.
    #[arg(
        long,
        global = true,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=31_536_000)
    )]
    pub quota_window_secs: u64,

    /// Log filter directive (for example `info` or `pricecache_core=debug`).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Log line format written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object output.
    Json,
    /// Aligned text for terminal display.
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Daily rates for a currency pair over a lookback period ending today.
    Forex(ForexArgs),
    /// Daily rows for an instrument between two dates, inclusive.
    Range(RangeArgs),
    /// First and last cached date for an instrument.
    Extent(ExtentArgs),
    /// Ranges that a read would fetch. Nothing is fetched or written.
    Gaps(RangeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ForexArgs {
    /// Base currency, 3-letter ISO code.
    #[arg(long)]
    pub from: String,

    /// Quote currency, 3-letter ISO code.
    #[arg(long)]
    pub to: String,

    /// Lookback period.
    #[arg(long, default_value = "1M", value_parser = parse_period)]
    pub period: Period,
}

#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// Instrument key, ASCII letters and digits.
    pub instrument: String,

    /// First date, `YYYY-MM-DD`.
    #[arg(long)]
    pub start: String,

    /// Last date, `YYYY-MM-DD`.
    #[arg(long)]
    pub end: String,
}

#[derive(Debug, Clone, Args)]
pub struct ExtentArgs {
    /// Instrument key, ASCII letters and digits.
    pub instrument: String,
}

fn parse_period(value: &str) -> Result<Period, String> {
    value.parse::<Period>().map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn forex_defaults_to_one_month() {
        let cli = Cli::try_parse_from(["pricecache", "forex", "--from", "USD", "--to", "INR"])
            .expect("parse");

        match cli.command {
            Command::Forex(args) => assert_eq!(args.period, Period::OneMonth),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_period_is_rejected() {
        let result = Cli::try_parse_from([
            "pricecache",
            "forex",
            "--from",
            "USD",
            "--to",
            "INR",
            "--period",
            "2W",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quota_window_is_bounded() {
        let huge = Cli::try_parse_from([
            "pricecache",
            "--quota-window-secs",
            "18446744073709551615",
            "extent",
            "EURUSD",
        ]);
        assert!(huge.is_err());

        let zero = Cli::try_parse_from([
            "pricecache",
            "--quota-window-secs",
            "0",
            "extent",
            "EURUSD",
        ]);
        assert!(zero.is_err());
    }

    #[test]
    fn db_path_and_ephemeral_conflict() {
        let result = Cli::try_parse_from([
            "pricecache",
            "--ephemeral",
            "--db-path",
            "/tmp/prices.duckdb",
            "extent",
            "EURUSD",
        ]);
        assert!(result.is_err());
    }
}
