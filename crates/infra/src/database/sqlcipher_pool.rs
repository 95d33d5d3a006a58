//! SQLCipher pool helpers
//!
//! Thin wrapper around the shared SQLCipher connection pool that converts
//! storage errors into the domain error type used by infrastructure code.

use std::path::Path;
use std::sync::Arc;

use outpost_common::storage::{SqlCipherPool, SqlCipherPoolConfig};
use outpost_domain::{OutpostError, Result as DomainResult};

use crate::errors::InfraError;

/// Build an `Arc<SqlCipherPool>` using domain error semantics.
pub fn create_sqlcipher_pool<P: AsRef<Path>>(
    path: P,
    encryption_key: String,
    config: SqlCipherPoolConfig,
) -> DomainResult<Arc<SqlCipherPool>> {
    SqlCipherPool::new(path.as_ref(), encryption_key, config)
        .map(Arc::new)
        .map_err(|err| OutpostError::from(InfraError::from(err)))
}
