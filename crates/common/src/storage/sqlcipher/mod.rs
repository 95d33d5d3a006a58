//! SQLCipher backend implementation

pub mod cipher;
pub mod config;
pub mod pool;
pub mod pragmas;

pub use cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
pub use config::SqlCipherPoolConfig;
pub use pool::{PoolHealth, SqlCipherConnection, SqlCipherPool};
pub use pragmas::apply_connection_pragmas;
