//! Load, mutate, save.
//!
//! Every waiting-list operation is a mutation run by [`AmbulanceUpdater`]:
//! the ambulance document is fetched once, handed to the mutation by value,
//! and written back only when the mutation returns a new state. The write is
//! guarded by the version the document was fetched at, so a concurrent writer
//! makes the slower request fail instead of silently losing an update.
//! Nothing is retried here.

use ambulance_wl_api::ApiError;
use ambulance_wl_core::Ambulance;
use ambulance_wl_storage::DynAmbulanceStore;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// What a mutation decided.
#[derive(Debug)]
pub struct MutationOutcome<T> {
    /// New document state; `None` means nothing is written.
    pub updated: Option<Ambulance>,
    pub status: StatusCode,
    pub body: Option<T>,
}

impl<T> MutationOutcome<T> {
    /// Read-only outcome: respond with `body`, skip the write.
    pub fn read(status: StatusCode, body: T) -> Self {
        Self {
            updated: None,
            status,
            body: Some(body),
        }
    }

    /// Persist `ambulance`, then respond with `status` and `body`.
    pub fn write(ambulance: Ambulance, status: StatusCode, body: Option<T>) -> Self {
        Self {
            updated: Some(ambulance),
            status,
            body,
        }
    }
}

/// Status and optional JSON body forwarded verbatim from a mutation.
#[derive(Debug, PartialEq)]
pub struct Reply<T> {
    pub status: StatusCode,
    pub body: Option<T>,
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

#[derive(Clone)]
pub struct AmbulanceUpdater {
    store: DynAmbulanceStore,
}

impl AmbulanceUpdater {
    pub fn new(store: DynAmbulanceStore) -> Self {
        Self { store }
    }

    /// Runs `mutation` against the current state of `ambulance_id`.
    ///
    /// Fails with 404 before the mutation runs if the ambulance is absent.
    /// Business errors returned by the mutation are passed through untouched
    /// and never reach the store. Fetch and replace failures become 500.
    pub async fn update<T, F>(&self, ambulance_id: &str, mutation: F) -> Result<Reply<T>, ApiError>
    where
        F: FnOnce(Ambulance) -> Result<MutationOutcome<T>, ApiError>,
    {
        let stored = match self.store.fetch_ambulance(ambulance_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::debug!(ambulance_id, "ambulance not found");
                return Err(ApiError::not_found("Ambulance not found"));
            }
            Err(err) => {
                tracing::error!(
                    ambulance_id,
                    category = %err.category(),
                    error = %err,
                    "failed to load ambulance"
                );
                return Err(
                    ApiError::internal("Failed to load ambulance from database").with_detail(err),
                );
            }
        };

        let version = stored.version;
        let outcome = mutation(stored.ambulance)?;

        if let Some(updated) = outcome.updated {
            if let Err(err) = self.store.replace_ambulance(&updated, Some(version)).await {
                tracing::error!(
                    ambulance_id,
                    version,
                    category = %err.category(),
                    error = %err,
                    "failed to replace ambulance document"
                );
                return Err(
                    ApiError::internal("Failed to update ambulance in database").with_detail(err),
                );
            }
            tracing::debug!(ambulance_id, version, "ambulance document replaced");
        }

        Ok(Reply {
            status: outcome.status,
            body: outcome.body,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ambulance_wl_core::Ambulance;
    use ambulance_wl_db_memory::InMemoryAmbulanceStore;
    use ambulance_wl_storage::{AmbulanceStore, StorageError, StoredAmbulance};
    use async_trait::async_trait;

    /// Wraps the in-memory store and counts replace calls.
    #[derive(Default)]
    pub struct CountingStore {
        pub inner: InMemoryAmbulanceStore,
        pub replaces: AtomicUsize,
        pub fail_replace: bool,
    }

    impl CountingStore {
        pub fn with(ambulance: Ambulance) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryAmbulanceStore::with_ambulances([ambulance]),
                ..Default::default()
            })
        }

        pub fn failing(ambulance: Ambulance) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryAmbulanceStore::with_ambulances([ambulance]),
                fail_replace: true,
                ..Default::default()
            })
        }

        pub fn replace_count(&self) -> usize {
            self.replaces.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AmbulanceStore for CountingStore {
        async fn fetch_ambulance(
            &self,
            id: &str,
        ) -> Result<Option<StoredAmbulance>, StorageError> {
            self.inner.fetch_ambulance(id).await
        }

        async fn replace_ambulance(
            &self,
            ambulance: &Ambulance,
            if_match: Option<i64>,
        ) -> Result<StoredAmbulance, StorageError> {
            self.replaces.fetch_add(1, Ordering::SeqCst);
            if self.fail_replace {
                return Err(StorageError::version_conflict(
                    &ambulance.id,
                    if_match.unwrap_or_default(),
                    if_match.unwrap_or_default() + 1,
                ));
            }
            self.inner.replace_ambulance(ambulance, if_match).await
        }

        async fn create_ambulance(
            &self,
            ambulance: &Ambulance,
        ) -> Result<StoredAmbulance, StorageError> {
            self.inner.create_ambulance(ambulance).await
        }

        async fn delete_ambulance(&self, id: &str) -> Result<(), StorageError> {
            self.inner.delete_ambulance(id).await
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CountingStore;
    use super::*;
    use ambulance_wl_db_memory::InMemoryAmbulanceStore;
    use ambulance_wl_storage::{AmbulanceStore, StorageError, StoredAmbulance};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl AmbulanceStore for BrokenStore {
        async fn fetch_ambulance(
            &self,
            _id: &str,
        ) -> Result<Option<StoredAmbulance>, StorageError> {
            Err(StorageError::connection_error("connection refused"))
        }

        async fn replace_ambulance(
            &self,
            ambulance: &Ambulance,
            _if_match: Option<i64>,
        ) -> Result<StoredAmbulance, StorageError> {
            Err(StorageError::not_found(&ambulance.id))
        }

        async fn create_ambulance(
            &self,
            ambulance: &Ambulance,
        ) -> Result<StoredAmbulance, StorageError> {
            Err(StorageError::already_exists(&ambulance.id))
        }

        async fn delete_ambulance(&self, id: &str) -> Result<(), StorageError> {
            Err(StorageError::not_found(id))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn missing_ambulance_is_404_and_mutation_never_runs() {
        let store = CountingStore::with(Ambulance::new("bobulova", "Dr. Bobulova"));
        let updater = AmbulanceUpdater::new(store.clone());
        let mut ran = false;

        let err = updater
            .update::<(), _>("nobody", |_| {
                ran = true;
                Ok(MutationOutcome::read(StatusCode::OK, ()))
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Ambulance not found");
        assert!(!ran);
        assert_eq!(store.replace_count(), 0);
    }

    #[tokio::test]
    async fn read_only_outcome_issues_no_write() {
        let store = CountingStore::with(Ambulance::new("bobulova", "Dr. Bobulova"));
        let updater = AmbulanceUpdater::new(store.clone());

        let reply = updater
            .update("bobulova", |ambulance| {
                Ok(MutationOutcome::read(StatusCode::OK, ambulance.name))
            })
            .await
            .unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.as_deref(), Some("Dr. Bobulova"));
        assert_eq!(store.replace_count(), 0);
    }

    #[tokio::test]
    async fn new_state_is_written_once_and_reply_forwarded() {
        let store = CountingStore::with(Ambulance::new("bobulova", "Dr. Bobulova"));
        let updater = AmbulanceUpdater::new(store.clone());

        let reply = updater
            .update::<(), _>("bobulova", |mut ambulance| {
                ambulance.room_number = "101".into();
                Ok(MutationOutcome::write(ambulance, StatusCode::NO_CONTENT, None))
            })
            .await
            .unwrap();

        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert!(reply.body.is_none());
        assert_eq!(store.replace_count(), 1);

        let stored = store.fetch_ambulance("bobulova").await.unwrap().unwrap();
        assert_eq!(stored.ambulance.room_number, "101");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn business_error_skips_the_store() {
        let store = CountingStore::with(Ambulance::new("bobulova", "Dr. Bobulova"));
        let updater = AmbulanceUpdater::new(store.clone());

        let err = updater
            .update::<(), _>("bobulova", |_| Err(ApiError::conflict("Entry already exists")))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(store.replace_count(), 0);
    }

    #[tokio::test]
    async fn replace_failure_is_500_with_detail() {
        let store = CountingStore::failing(Ambulance::new("bobulova", "Dr. Bobulova"));
        let updater = AmbulanceUpdater::new(store.clone());

        let err = updater
            .update::<(), _>("bobulova", |ambulance| {
                Ok(MutationOutcome::write(ambulance, StatusCode::OK, None))
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to update ambulance in database");
        assert!(err.detail().is_some());
        assert_eq!(store.replace_count(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_500() {
        let updater = AmbulanceUpdater::new(std::sync::Arc::new(BrokenStore));

        let err = updater
            .update::<(), _>("bobulova", |ambulance| {
                Ok(MutationOutcome::write(ambulance, StatusCode::OK, None))
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), Some("Connection error: connection refused"));
    }

    /// Commits a competing write right after every fetch.
    struct RacingStore {
        inner: InMemoryAmbulanceStore,
    }

    #[async_trait]
    impl AmbulanceStore for RacingStore {
        async fn fetch_ambulance(
            &self,
            id: &str,
        ) -> Result<Option<StoredAmbulance>, StorageError> {
            let stored = self.inner.fetch_ambulance(id).await?;
            if let Some(current) = &stored {
                let mut other = current.ambulance.clone();
                other.name = "Dr. Other".into();
                self.inner
                    .replace_ambulance(&other, Some(current.version))
                    .await?;
            }
            Ok(stored)
        }

        async fn replace_ambulance(
            &self,
            ambulance: &Ambulance,
            if_match: Option<i64>,
        ) -> Result<StoredAmbulance, StorageError> {
            self.inner.replace_ambulance(ambulance, if_match).await
        }

        async fn create_ambulance(
            &self,
            ambulance: &Ambulance,
        ) -> Result<StoredAmbulance, StorageError> {
            self.inner.create_ambulance(ambulance).await
        }

        async fn delete_ambulance(&self, id: &str) -> Result<(), StorageError> {
            self.inner.delete_ambulance(id).await
        }

        fn backend_name(&self) -> &'static str {
            "racing"
        }
    }

    #[tokio::test]
    async fn concurrent_writer_makes_the_stale_replace_fail() {
        let store = std::sync::Arc::new(RacingStore {
            inner: InMemoryAmbulanceStore::with_ambulances([Ambulance::new(
                "bobulova",
                "Dr. Bobulova",
            )]),
        });
        let updater = AmbulanceUpdater::new(store.clone());

        let err = updater
            .update::<(), _>("bobulova", |mut ambulance| {
                ambulance.name = "Dr. Mine".into();
                Ok(MutationOutcome::write(ambulance, StatusCode::OK, None))
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let stored = store.inner.fetch_ambulance("bobulova").await.unwrap().unwrap();
        assert_eq!(stored.ambulance.name, "Dr. Other");
        assert_eq!(stored.version, 2);
    }
}
