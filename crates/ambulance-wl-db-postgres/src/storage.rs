//! PostgreSQL implementation of the `AmbulanceStore` trait.
//!
//! Each ambulance is a row of the `ambulance` table holding the whole
//! document in a JSONB column. Replaces are a single `UPDATE` guarded by the
//! row version, so the database detects concurrent writers.

use ambulance_wl_core::Ambulance;
use ambulance_wl_storage::{AmbulanceStore, StorageError, StoredAmbulance};
use async_trait::async_trait;
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::PostgresError;
use crate::migrations;
use crate::pool;

type DocumentRow = (Value, i64, OffsetDateTime, OffsetDateTime);
type VersionRow = (i64, OffsetDateTime, OffsetDateTime);

/// PostgreSQL storage backend for ambulance documents.
#[derive(Debug, Clone)]
pub struct PostgresAmbulanceStore {
    pool: PgPool,
}

impl PostgresAmbulanceStore {
    /// Creates a new store with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }
}

fn db_error(err: sqlx_core::error::Error) -> StorageError {
    PostgresError::from(err).into()
}

fn encode(ambulance: &Ambulance) -> Result<Value, StorageError> {
    serde_json::to_value(ambulance).map_err(|e| PostgresError::Document(e).into())
}

fn decode(document: Value) -> Result<Ambulance, StorageError> {
    serde_json::from_value(document).map_err(|e| PostgresError::Document(e).into())
}

#[async_trait]
impl AmbulanceStore for PostgresAmbulanceStore {
    #[instrument(skip(self))]
    async fn fetch_ambulance(&self, id: &str) -> Result<Option<StoredAmbulance>, StorageError> {
        let row: Option<DocumentRow> = query_as(
            "SELECT document, version, created_at, updated_at FROM ambulance WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(|(document, version, created_at, last_updated)| {
            Ok(StoredAmbulance {
                ambulance: decode(document)?,
                version,
                last_updated,
                created_at,
            })
        })
        .transpose()
    }

    #[instrument(skip(self, ambulance), fields(ambulance_id = %ambulance.id))]
    async fn replace_ambulance(
        &self,
        ambulance: &Ambulance,
        if_match: Option<i64>,
    ) -> Result<StoredAmbulance, StorageError> {
        let document = encode(ambulance)?;

        let row: Option<VersionRow> = query_as(
            r#"UPDATE ambulance
               SET document = $2, version = version + 1, updated_at = now()
               WHERE id = $1 AND ($3::BIGINT IS NULL OR version = $3)
               RETURNING version, created_at, updated_at"#,
        )
        .bind(&ambulance.id)
        .bind(&document)
        .bind(if_match)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if let Some((version, created_at, last_updated)) = row {
            return Ok(StoredAmbulance {
                ambulance: ambulance.clone(),
                version,
                last_updated,
                created_at,
            });
        }

        // Nothing matched: the row is gone or someone else wrote first.
        let actual: Option<i64> = query_scalar("SELECT version FROM ambulance WHERE id = $1")
            .bind(&ambulance.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match (actual, if_match) {
            (Some(actual), Some(expected)) => {
                debug!(expected, actual, "rejecting replace of a modified document");
                Err(StorageError::version_conflict(&ambulance.id, expected, actual))
            }
            _ => Err(StorageError::not_found(&ambulance.id)),
        }
    }

    #[instrument(skip(self, ambulance), fields(ambulance_id = %ambulance.id))]
    async fn create_ambulance(
        &self,
        ambulance: &Ambulance,
    ) -> Result<StoredAmbulance, StorageError> {
        if ambulance.id.is_empty() {
            return Err(StorageError::invalid_document("ambulance id must not be empty"));
        }
        let document = encode(ambulance)?;

        let row: Option<VersionRow> = query_as(
            r#"INSERT INTO ambulance (id, version, document)
               VALUES ($1, 1, $2)
               ON CONFLICT (id) DO NOTHING
               RETURNING version, created_at, updated_at"#,
        )
        .bind(&ambulance.id)
        .bind(&document)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let (version, created_at, last_updated) =
            row.ok_or_else(|| StorageError::already_exists(&ambulance.id))?;

        Ok(StoredAmbulance {
            ambulance: ambulance.clone(),
            version,
            last_updated,
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn delete_ambulance(&self, id: &str) -> Result<(), StorageError> {
        let result = query("DELETE FROM ambulance WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(id));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
