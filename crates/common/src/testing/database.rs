//! Throwaway SQLCipher databases.
//!
//! The database file lives in a temporary directory that is removed when the
//! helper is dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::storage::{SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig, StorageResult};

/// Key used by every test database.
pub const TEST_ENCRYPTION_KEY: &str =
    "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Temporary on-disk SQLCipher database with its pool.
#[derive(Debug)]
pub struct SqlCipherTestDatabase {
    _temp_dir: TempDir,
    db_path: PathBuf,
    pool: Arc<SqlCipherPool>,
}

impl SqlCipherTestDatabase {
    pub fn new() -> StorageResult<Self> {
        Self::with_pool_config(SqlCipherPoolConfig::default())
    }

    pub fn with_pool_config(config: SqlCipherPoolConfig) -> StorageResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("outpost-test.db");
        let pool = SqlCipherPool::new(&db_path, TEST_ENCRYPTION_KEY.to_string(), config)?;
        Ok(Self { _temp_dir: temp_dir, db_path, pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> Arc<SqlCipherPool> {
        self.pool.clone()
    }

    pub fn connection(&self) -> StorageResult<SqlCipherConnection> {
        self.pool.get_connection()
    }

    /// Execute a SQL script (possibly several statements).
    pub fn run_script(&self, sql: &str) -> StorageResult<()> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}
