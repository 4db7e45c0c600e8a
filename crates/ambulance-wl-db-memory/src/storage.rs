use ambulance_wl_core::Ambulance;
use ambulance_wl_storage::{AmbulanceStore, StorageError, StoredAmbulance};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// In-memory ambulance store.
///
/// Documents are keyed by ambulance id. Each replace bumps the document
/// version under the shard's write lock, so a replace guarded by a stale
/// version is rejected even when two requests race on the same ambulance.
#[derive(Debug, Default)]
pub struct InMemoryAmbulanceStore {
    documents: DashMap<String, StoredAmbulance>,
}

impl InMemoryAmbulanceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given ambulances.
    pub fn with_ambulances(ambulances: impl IntoIterator<Item = Ambulance>) -> Self {
        let documents = ambulances
            .into_iter()
            .map(|ambulance| (ambulance.id.clone(), StoredAmbulance::new(ambulance)))
            .collect();
        Self { documents }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl AmbulanceStore for InMemoryAmbulanceStore {
    async fn fetch_ambulance(&self, id: &str) -> Result<Option<StoredAmbulance>, StorageError> {
        Ok(self.documents.get(id).map(|doc| doc.value().clone()))
    }

    async fn replace_ambulance(
        &self,
        ambulance: &Ambulance,
        if_match: Option<i64>,
    ) -> Result<StoredAmbulance, StorageError> {
        let mut slot = self
            .documents
            .get_mut(&ambulance.id)
            .ok_or_else(|| StorageError::not_found(&ambulance.id))?;

        if let Some(expected) = if_match {
            if slot.version != expected {
                tracing::debug!(
                    ambulance_id = %ambulance.id,
                    expected,
                    actual = slot.version,
                    "rejecting replace of a modified document"
                );
                return Err(StorageError::version_conflict(
                    &ambulance.id,
                    expected,
                    slot.version,
                ));
            }
        }

        let next = slot.next_version(ambulance.clone());
        *slot = next.clone();
        Ok(next)
    }

    async fn create_ambulance(
        &self,
        ambulance: &Ambulance,
    ) -> Result<StoredAmbulance, StorageError> {
        if ambulance.id.is_empty() {
            return Err(StorageError::invalid_document("ambulance id must not be empty"));
        }

        match self.documents.entry(ambulance.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::already_exists(&ambulance.id)),
            Entry::Vacant(vacant) => {
                let stored = StoredAmbulance::new(ambulance.clone());
                vacant.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn delete_ambulance(&self, id: &str) -> Result<(), StorageError> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(id))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
