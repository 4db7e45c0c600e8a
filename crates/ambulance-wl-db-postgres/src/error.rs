//! Error types for the PostgreSQL storage backend.

use ambulance_wl_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection or query error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored document could not be decoded.
    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(SqlxError::PoolTimedOut) => {
                StorageError::connection_error("Pool error: timed out acquiring a connection")
            }
            PostgresError::Connection(SqlxError::Database(db_err)) => {
                StorageError::internal(format!("Database error: {db_err}"))
            }
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Document(e) => StorageError::invalid_document(e.to_string()),
        }
    }
}
