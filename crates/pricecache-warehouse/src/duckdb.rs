//! `DuckDB` connection pool management.
//!
//! All pooled connections are cloned from one root connection so they share a
//! single database instance; opening the same file twice in one process would
//! contend on the file lock.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

use crate::WarehouseError;

struct PoolInner {
    max_pool_size: usize,
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

/// A connection pool over one `DuckDB` database file.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database file and create a pool around it.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_pool_size: usize) -> Result<Self, WarehouseError> {
        let db_path = path.into();
        let root = Connection::open(db_path.as_path())?;
        configure_connection(&root)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Acquire a connection, reusing an idle one when available.
    ///
    /// # Errors
    /// Returns an error if a new connection cannot be cloned from the root or
    /// if a pool mutex was poisoned by a panicking holder.
    pub fn acquire(&self) -> Result<PooledConnection, WarehouseError> {
        let reused = self
            .inner
            .idle
            .lock()
            .map_err(|_| WarehouseError::PoolPoisoned)?
            .pop();

        let connection = match reused {
            Some(connection) => connection,
            None => {
                let root = self
                    .inner
                    .root
                    .lock()
                    .map_err(|_| WarehouseError::PoolPoisoned)?;
                let connection = root.try_clone()?;
                configure_connection(&connection)?;
                connection
            }
        };

        Ok(PooledConnection {
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Number of connections currently parked in the pool.
    #[must_use]
    pub fn idle_len(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl PooledConnection {
    /// Closes the connection instead of returning it to the pool.
    pub fn discard(mut self) {
        self.connection.take();
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection is only taken on drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection is only taken on drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        // A poisoned pool simply stops recycling; the connection is closed.
        if let Ok(mut idle) = self.pool.idle.lock() {
            if idle.len() < self.pool.max_pool_size {
                idle.push(connection);
            }
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn released_connections_are_reused_up_to_pool_size() {
        let temp = tempdir().expect("tempdir");
        let manager =
            DuckDbConnectionManager::open(temp.path().join("pool.duckdb"), 1).expect("open pool");

        let first = manager.acquire().expect("first");
        let second = manager.acquire().expect("second");
        drop(first);
        drop(second);

        assert_eq!(manager.idle_len(), 1);
    }

    #[test]
    fn cloned_connections_share_one_database() {
        let temp = tempdir().expect("tempdir");
        let manager =
            DuckDbConnectionManager::open(temp.path().join("shared.duckdb"), 2).expect("open pool");

        let writer = manager.acquire().expect("writer");
        writer
            .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);")
            .expect("write");

        let reader = manager.acquire().expect("reader");
        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .expect("read");
        assert_eq!(count, 1);
    }

    #[test]
    fn discarded_connections_are_not_recycled() {
        let temp = tempdir().expect("tempdir");
        let manager = DuckDbConnectionManager::open(temp.path().join("discard.duckdb"), 2)
            .expect("open pool");

        let kept = manager.acquire().expect("kept");
        let broken = manager.acquire().expect("broken");
        broken.discard();
        drop(kept);

        assert_eq!(manager.idle_len(), 1);
    }
}
