//! Storage traits for the ambulance document store.

use ambulance_wl_core::Ambulance;
use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::StoredAmbulance;

/// The contract every ambulance document store backend implements.
///
/// A document is always read and written as a whole; there are no partial
/// field updates. Implementations must be thread-safe (`Send + Sync`) and must
/// not retry on their own: a failed replace is reported to the caller.
///
/// # Example
///
/// ```ignore
/// use ambulance_wl_storage::{AmbulanceStore, StorageError, StoredAmbulance};
///
/// async fn load(store: &dyn AmbulanceStore, id: &str) -> Result<StoredAmbulance, StorageError> {
///     store
///         .fetch_ambulance(id)
///         .await?
///         .ok_or_else(|| StorageError::not_found(id))
/// }
/// ```
#[async_trait]
pub trait AmbulanceStore: Send + Sync {
    /// Fetches one ambulance document by id.
    ///
    /// Returns `None` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing documents.
    async fn fetch_ambulance(&self, id: &str) -> Result<Option<StoredAmbulance>, StorageError>;

    /// Replaces an existing document with `ambulance`.
    ///
    /// If `if_match` is provided, the replace only succeeds when the stored
    /// version still equals it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document no longer exists.
    /// Returns `StorageError::VersionConflict` if `if_match` doesn't match.
    async fn replace_ambulance(
        &self,
        ambulance: &Ambulance,
        if_match: Option<i64>,
    ) -> Result<StoredAmbulance, StorageError>;

    /// Creates a new document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a document with the same id exists.
    async fn create_ambulance(&self, ambulance: &Ambulance)
    -> Result<StoredAmbulance, StorageError>;

    /// Deletes a document by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    async fn delete_ambulance(&self, id: &str) -> Result<(), StorageError>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
