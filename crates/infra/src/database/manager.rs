//! Database connection manager backed by the shared SQLCipher pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use outpost_common::storage::{PoolHealth, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig};
use outpost_domain::{OutpostError, Result};
use rusqlite::params;
use tracing::info;

use super::sqlcipher_pool::create_sqlcipher_pool;
use crate::errors::InfraError;

pub(crate) const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlCipherPool`].
pub struct DbManager {
    pool: Arc<SqlCipherPool>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and SQLCipher key.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        encryption_key: Option<&str>,
    ) -> Result<Self> {
        let key = encryption_key
            .filter(|key| !key.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| OutpostError::Config("database encryption key not provided".into()))?;

        let path = db_path.as_ref().to_path_buf();
        let pool = create_sqlcipher_pool(&path, key, SqlCipherPoolConfig::with_max_size(pool_size))?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlcipher pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Borrow the underlying SQLCipher pool.
    pub fn pool(&self) -> &Arc<SqlCipherPool> {
        &self.pool
    }

    /// Acquire a SQLCipher connection from the pool.
    pub fn get_connection(&self) -> Result<SqlCipherConnection> {
        self.pool.get_connection().map_err(|err| InfraError::from(err).into())
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire a connection, run `SELECT 1` and report pool occupancy.
    pub fn health_check(&self) -> Result<PoolHealth> {
        self.pool.health_check().map_err(|err| InfraError::from(err).into())
    }
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> OutpostError {
    OutpostError::from(InfraError::from(err))
}
