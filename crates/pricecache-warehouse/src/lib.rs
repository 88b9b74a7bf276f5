//! DuckDB-backed storage for cached daily price rows.
//!
//! Rows live in a single `daily_prices` table partitioned by an instrument
//! column; every instrument value is a bound parameter, never part of the SQL
//! text. Dates travel as ISO `YYYY-MM-DD` strings and are stored as `DATE`.

pub mod duckdb;
pub mod migrations;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use ::duckdb::params;
use serde::Serialize;
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("connection pool mutex poisoned")]
    PoolPoisoned,

    #[error("writer mutex poisoned")]
    WriterPoisoned,
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub pricecache_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let pricecache_home = resolve_pricecache_home();
        let db_path = env::var_os("PRICECACHE_DB_PATH")
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| pricecache_home.join("cache").join("prices.duckdb"));
        Self {
            pricecache_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Config pointing at an explicit database file.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// One stored daily OHLCV row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

/// Outcome of a single gap fetch, appended to `fetch_log`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchLogEntry {
    pub instrument: String,
    pub gap_start: String,
    pub gap_end: String,
    pub status: String,
    pub row_count: u64,
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Shared handle over one DuckDB file.
///
/// Reads run on any pooled connection. Writes are serialized through one
/// writer lock so concurrent upserts of the same dates cannot conflict.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
    writer: Arc<Mutex<()>>,
}

impl Warehouse {
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self {
            manager,
            writer: Arc::new(Mutex::new(())),
        };
        warehouse.initialize()?;
        tracing::debug!(db_path = %config.db_path.display(), "warehouse opened");
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Registers the instrument partition. Returns `true` when it was created.
    pub fn ensure_instrument(&self, instrument: &str) -> Result<bool, WarehouseError> {
        let _writer = self.lock_writer()?;
        let connection = self.manager.acquire()?;
        let inserted = connection.execute(
            "INSERT OR IGNORE INTO instruments (instrument) VALUES (?)",
            params![instrument],
        )?;
        if inserted > 0 {
            tracing::info!(instrument, "created instrument partition");
        }
        Ok(inserted > 0)
    }

    pub fn instrument_exists(&self, instrument: &str) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM instruments WHERE instrument = ?",
            params![instrument],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn instruments(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement =
            connection.prepare("SELECT instrument FROM instruments ORDER BY instrument")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(WarehouseError::from)
    }

    /// Minimum and maximum stored dates for the instrument, over all rows.
    pub fn date_extent(
        &self,
        instrument: &str,
    ) -> Result<Option<(String, String)>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let (min_date, max_date): (Option<String>, Option<String>) = connection.query_row(
            "SELECT CAST(MIN(date) AS VARCHAR), CAST(MAX(date) AS VARCHAR) \
             FROM daily_prices WHERE instrument = ?",
            params![instrument],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(min_date.zip(max_date))
    }

    /// Rows with `start <= date <= end`, ascending by date.
    pub fn read_prices(
        &self,
        instrument: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<PriceRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT CAST(date AS VARCHAR), open, high, low, close, adj_close, volume \
             FROM daily_prices \
             WHERE instrument = ? AND date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE) \
             ORDER BY date ASC",
        )?;
        let rows = statement.query_map(params![instrument, start, end], |row| {
            Ok(PriceRow {
                date: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                adj_close: row.get(5)?,
                volume: row.get(6)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(WarehouseError::from)
    }

    /// Insert-or-overwrite rows keyed by `(instrument, date)` in one transaction.
    ///
    /// When the batch repeats a date, the last row for that date wins. Returns
    /// the number of distinct dates written.
    pub fn upsert_prices(
        &self,
        instrument: &str,
        rows: &[PriceRow],
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let latest_by_date = rows
            .iter()
            .map(|row| (row.date.as_str(), row))
            .collect::<BTreeMap<_, _>>();

        let _writer = self.lock_writer()?;
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            connection.execute(
                "INSERT OR IGNORE INTO instruments (instrument) VALUES (?)",
                params![instrument],
            )?;

            let mut statement = connection.prepare(
                "INSERT OR REPLACE INTO daily_prices (\
                    instrument, date, open, high, low, close, adj_close, volume, updated_at\
                 ) VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            )?;
            for row in latest_by_date.values() {
                statement.execute(params![
                    instrument,
                    row.date.as_str(),
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.adj_close,
                    row.volume,
                ])?;
            }

            Ok(latest_by_date.len())
        })();

        let written = finalize_transaction(connection, result)?;
        tracing::debug!(instrument, rows = written, "upserted price rows");
        Ok(written)
    }

    pub fn record_fetch(&self, entry: &FetchLogEntry) -> Result<(), WarehouseError> {
        let _writer = self.lock_writer()?;
        let connection = self.manager.acquire()?;
        connection.execute(
            "INSERT INTO fetch_log (\
                instrument, gap_start, gap_end, status, row_count, message, latency_ms\
             ) VALUES (?, CAST(? AS DATE), CAST(? AS DATE), ?, ?, ?, ?)",
            params![
                entry.instrument.as_str(),
                entry.gap_start.as_str(),
                entry.gap_end.as_str(),
                entry.status.as_str(),
                saturating_i64(entry.row_count),
                entry.message.as_deref(),
                saturating_i64(entry.latency_ms),
            ],
        )?;
        Ok(())
    }

    /// Fetch attempts for the instrument, oldest first.
    pub fn fetch_log(&self, instrument: &str) -> Result<Vec<FetchLogEntry>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT instrument, CAST(gap_start AS VARCHAR), CAST(gap_end AS VARCHAR), status, \
                    row_count, message, latency_ms \
             FROM fetch_log WHERE instrument = ? ORDER BY id ASC",
        )?;
        let rows = statement.query_map(params![instrument], |row| {
            let row_count: i64 = row.get(4)?;
            let latency_ms: i64 = row.get(6)?;
            Ok(FetchLogEntry {
                instrument: row.get(0)?,
                gap_start: row.get(1)?,
                gap_end: row.get(2)?,
                status: row.get(3)?,
                row_count: u64::try_from(row_count).unwrap_or_default(),
                message: row.get(5)?,
                latency_ms: u64::try_from(latency_ms).unwrap_or_default(),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(WarehouseError::from)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>, WarehouseError> {
        self.writer.lock().map_err(|_| WarehouseError::WriterPoisoned)
    }
}

fn finalize_transaction<T>(
    connection: PooledConnection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = connection.execute_batch("ROLLBACK") {
                // The transaction may still be open; keep it out of the pool.
                tracing::warn!(error = %rollback_error, "rollback failed, discarding connection");
                connection.discard();
            }
            Err(error)
        }
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn resolve_pricecache_home() -> PathBuf {
    if let Some(path) = env::var_os("PRICECACHE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pricecache");
    }

    PathBuf::from(".pricecache")
}
