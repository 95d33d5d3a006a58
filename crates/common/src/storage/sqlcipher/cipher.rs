//! SQLCipher key and cipher pragmas

use rusqlite::Connection;
use tracing::{debug, error};
use zeroize::Zeroizing;

use crate::storage::error::{StorageError, StorageResult};

/// SQLCipher configuration
#[derive(Clone)]
pub struct SqlCipherConfig {
    /// Encryption key, wiped from memory on drop.
    pub key: Zeroizing<String>,

    /// Cipher compatibility version (default: 4 for SQLCipher 4.x)
    pub cipher_compatibility: i32,

    /// KDF iterations for key derivation (default: 256000)
    pub kdf_iter: i32,
}

// Custom Debug impl to avoid exposing the key
impl std::fmt::Debug for SqlCipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherConfig")
            .field("key", &"***")
            .field("cipher_compatibility", &self.cipher_compatibility)
            .field("kdf_iter", &self.kdf_iter)
            .finish()
    }
}

impl SqlCipherConfig {
    pub fn new(key: String) -> Self {
        Self { key: Zeroizing::new(key), cipher_compatibility: 4, kdf_iter: 256_000 }
    }
}

/// Apply the key and cipher pragmas. Must run before any other statement on
/// the connection.
///
/// # Errors
/// Returns an error if any pragma fails to apply
pub fn configure_sqlcipher(conn: &Connection, config: &SqlCipherConfig) -> StorageResult<()> {
    conn.pragma_update(None, "key", config.key.as_str()).map_err(|e| {
        error!(error = %e, "SQLCipher key setup failed");
        StorageError::classify_open_failure(&e.to_string(), || {
            StorageError::Encryption(format!("Failed to set encryption key: {e}"))
        })
    })?;

    conn.pragma_update(None, "cipher_compatibility", config.cipher_compatibility)
        .map_err(|e| StorageError::Encryption(format!("Failed to set cipher_compatibility: {e}")))?;

    conn.pragma_update(None, "kdf_iter", config.kdf_iter)
        .map_err(|e| StorageError::Encryption(format!("Failed to set kdf_iter: {e}")))?;

    debug!("SQLCipher configured");
    Ok(())
}

/// Force SQLCipher to decrypt a page so a wrong key surfaces immediately
/// instead of on the first real query.
///
/// # Errors
/// Returns `WrongKeyOrNotEncrypted` if the key does not open the database
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())).map_err(|e| {
        error!(error = %e, "Encryption verification failed");
        StorageError::classify_open_failure(&e.to_string(), || StorageError::from(e))
    })
}
