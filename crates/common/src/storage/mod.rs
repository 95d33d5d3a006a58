//! Encrypted SQLite storage
//!
//! r2d2 pooling over SQLCipher connections. Schema management belongs to the
//! application using the pool.

pub mod error;
pub mod sqlcipher;

pub use error::{StorageError, StorageResult};
pub use sqlcipher::{
    apply_connection_pragmas, PoolHealth, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig,
};
