mod extent;
mod forex;
mod gaps;
mod range;

use std::sync::Arc;
use std::time::{Duration, Instant};

use pricecache_core::{
    CacheFillCoordinator, Envelope, EnvelopeError, EnvelopeMeta, FetchPolicy, FillReport,
    MemoryStore, RangeStore, SyntheticFetcher, ThrottledFetcher, Warehouse, WarehouseConfig,
};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub type Coordinator =
    CacheFillCoordinator<Arc<dyn RangeStore>, ThrottledFetcher<SyntheticFetcher>>;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub cache_hit: bool,
    pub fill: Option<FillReport>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            cache_hit: true,
            fill: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Takes cache-hit status and fetch-failure warnings from the fill.
    pub fn with_fill(mut self, report: FillReport) -> Self {
        self.cache_hit = report.cache_hit();
        self.fill = Some(report);
        self
    }
}

/// Store and fetch settings shared by every command in one invocation.
pub struct Runtime {
    store: Arc<dyn RangeStore>,
    fetch_policy: FetchPolicy,
}

impl Runtime {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let store: Arc<dyn RangeStore> = if cli.ephemeral {
            tracing::debug!("using in-memory cache");
            Arc::new(MemoryStore::new())
        } else {
            let config = match &cli.db_path {
                Some(path) => WarehouseConfig::with_db_path(path.clone()),
                None => WarehouseConfig::default(),
            };
            Arc::new(Warehouse::open(config)?)
        };

        let fetch_policy = FetchPolicy {
            quota_window: Duration::from_secs(cli.quota_window_secs),
            quota_limit: cli.quota_limit,
            ..FetchPolicy::default()
        };

        Ok(Self {
            store,
            fetch_policy,
        })
    }

    pub fn store(&self) -> &dyn RangeStore {
        self.store.as_ref()
    }

    pub fn coordinator(&self) -> Coordinator {
        CacheFillCoordinator::new(
            Arc::clone(&self.store),
            ThrottledFetcher::new(SyntheticFetcher::default(), &self.fetch_policy),
        )
    }
}

pub fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let runtime = Runtime::from_cli(cli)?;

    let command_result = match &cli.command {
        Command::Forex(args) => forex::run(args, &runtime)?,
        Command::Range(args) => range::run(args, &runtime)?,
        Command::Extent(args) => extent::run(args, &runtime)?,
        Command::Gaps(args) => gaps::run(args, &runtime)?,
    };

    let CommandResult {
        data,
        warnings,
        cache_hit,
        fill,
    } = command_result;

    let mut meta = EnvelopeMeta::new(new_request_id(), elapsed_ms(started), cache_hit)?;
    if let Some(report) = &fill {
        meta.push_fill_warnings(report);
    }
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope::success(meta, data))
}

/// Envelope carrying a single error and no data.
pub fn failure_envelope(error: &CliError) -> Result<Envelope<Value>, CliError> {
    let meta = EnvelopeMeta::new(new_request_id(), 0, false)?;
    let payload = EnvelopeError::new(error.code(), error.to_string())?
        .with_retryable(error.exit_code() == 10);
    Envelope::with_errors(meta, Value::Null, vec![payload]).map_err(CliError::from)
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
