//! SQLCipher connection pool
//!
//! Every connection handed out by the pool has the key applied, the
//! encryption verified and the connection pragmas set.

use std::path::Path;
use std::time::Instant;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
use super::config::SqlCipherPoolConfig;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

/// Pooled connection. Derefs to `rusqlite::Connection` and returns to the
/// pool on drop.
pub type SqlCipherConnection = PooledConnection<SqliteConnectionManager>;

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolHealth {
    pub connections: u32,
    pub idle_connections: u32,
    pub max_size: u32,
}

/// SQLCipher connection pool
#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
}

impl SqlCipherPool {
    /// Open (or create) the database at `path` and build the pool.
    ///
    /// One connection is acquired eagerly so a wrong key fails here rather
    /// than on first use.
    ///
    /// # Errors
    /// Returns `WrongKeyOrNotEncrypted` for a key mismatch and `Connection`
    /// when the pool cannot be built.
    #[instrument(skip(encryption_key, config), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        encryption_key: String,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        let cipher_config = SqlCipherConfig::new(encryption_key);
        let pragma_config = config.clone();

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            verify_encryption(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            apply_connection_pragmas(conn, &pragma_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                StorageError::classify_open_failure(&e.to_string(), || {
                    StorageError::Connection(format!("Failed to create pool: {e}"))
                })
            })?;

        info!(max_size = config.max_size, "SQLCipher pool created");
        Ok(Self { pool, config })
    }

    /// Check out a connection.
    ///
    /// # Errors
    /// `Timeout` when no connection frees up within the configured timeout.
    pub fn get_connection(&self) -> StorageResult<SqlCipherConnection> {
        let start = Instant::now();
        match self.pool.get() {
            Ok(conn) => {
                debug!(wait_ms = start.elapsed().as_millis() as u64, "connection acquired");
                Ok(conn)
            }
            Err(e) => {
                let message = e.to_string();
                if message.to_lowercase().contains("timed out") {
                    warn!(timeout = ?self.config.connection_timeout, "connection timeout");
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    warn!(error = %message, "connection error");
                    Err(StorageError::classify_open_failure(&message, || {
                        StorageError::Connection(format!("Failed to get connection: {message}"))
                    }))
                }
            }
        }
    }

    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }

    /// Acquire a connection and run a trivial query.
    ///
    /// # Errors
    /// Propagates connection or query failures.
    pub fn health_check(&self) -> StorageResult<PoolHealth> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
        drop(conn);

        let state = self.pool.state();
        Ok(PoolHealth {
            connections: state.connections,
            idle_connections: state.idle_connections,
            max_size: self.config.max_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn pool_hands_out_working_connections() {
        let temp_dir = TempDir::new().unwrap();
        let pool = SqlCipherPool::new(
            &temp_dir.path().join("pool.db"),
            KEY.to_string(),
            SqlCipherPoolConfig::default(),
        )
        .unwrap();

        let conn = pool.get_connection().unwrap();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", []).unwrap();
        drop(conn);

        let health = pool.health_check().unwrap();
        assert_eq!(health.max_size, 4);
        assert!(health.connections >= 1);
    }

    #[test]
    fn reopening_with_wrong_key_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pool.db");

        {
            let pool =
                SqlCipherPool::new(&path, KEY.to_string(), SqlCipherPoolConfig::default()).unwrap();
            let conn = pool.get_connection().unwrap();
            conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", []).unwrap();
        }

        let result = SqlCipherPool::new(&path, "wrong".to_string(), SqlCipherPoolConfig::default());
        assert!(result.is_err());
    }
}
