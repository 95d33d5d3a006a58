//! Conversions from external infrastructure errors into domain errors.

use outpost_common::storage::StorageError;
use outpost_domain::OutpostError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub OutpostError);

impl From<InfraError> for OutpostError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<OutpostError> for InfraError {
    fn from(value: OutpostError) -> Self {
        InfraError(value)
    }
}

trait IntoOutpostError {
    fn into_outpost(self) -> OutpostError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → OutpostError */
/* -------------------------------------------------------------------------- */

impl IntoOutpostError for SqlError {
    fn into_outpost(self) -> OutpostError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        fn looks_like_wrong_key(message: &str) -> bool {
            let lower = message.to_ascii_lowercase();
            lower.contains("not a database") || lower.contains("encrypted")
        }

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => OutpostError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        OutpostError::Database("database is locked".into())
                    }
                    (ErrorCode::DiskFull, _) => OutpostError::Database("disk is full".into()),
                    (ErrorCode::ConstraintViolation, 2067) => {
                        OutpostError::Database("unique constraint violation".into())
                    }
                    (_, _) if looks_like_wrong_key(&message) => OutpostError::Database(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    _ => OutpostError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => OutpostError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                OutpostError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                OutpostError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => OutpostError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => OutpostError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_outpost())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → OutpostError */
/* -------------------------------------------------------------------------- */

impl IntoOutpostError for StorageError {
    fn into_outpost(self) -> OutpostError {
        match self {
            StorageError::Rusqlite(err) => err.into_outpost(),
            StorageError::InvalidConfig(message) => OutpostError::Config(message),
            other => OutpostError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_outpost())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → OutpostError */
/* -------------------------------------------------------------------------- */

impl IntoOutpostError for HttpError {
    fn into_outpost(self) -> OutpostError {
        if self.is_timeout() {
            return OutpostError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return OutpostError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => OutpostError::Auth(message),
                404 => OutpostError::NotFound(message),
                400..=499 => OutpostError::InvalidInput(message),
                _ => OutpostError::Network(message),
            };
        }

        OutpostError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_outpost())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
