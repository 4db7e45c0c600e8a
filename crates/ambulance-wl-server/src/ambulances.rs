//! Ambulance document lifecycle: create and delete whole ambulances.

use std::collections::HashSet;

use ambulance_wl_api::ApiError;
use ambulance_wl_core::{Ambulance, generate_id, needs_generated_id};
use ambulance_wl_storage::DynAmbulanceStore;
use axum::body::Bytes;
use axum::http::StatusCode;
use time::OffsetDateTime;
use tracing::Instrument;

use crate::observability::Telemetry;
use crate::updater::Reply;
use crate::waiting_list::{bind, finish};

/// Raw request body, decoded as JSON whatever its `Content-Type` says.
pub type AmbulanceBody = Bytes;

#[derive(Clone)]
pub struct AmbulanceApi {
    store: DynAmbulanceStore,
    telemetry: Telemetry,
    clock: fn() -> OffsetDateTime,
}

impl AmbulanceApi {
    pub fn new(store: DynAmbulanceStore, telemetry: Telemetry) -> Self {
        Self {
            store,
            telemetry,
            clock: ambulance_wl_core::now_utc,
        }
    }

    /// Stores a new ambulance document.
    ///
    /// The ambulance id and every entry id are generated when empty or
    /// `"@new"`. The initial list must already respect id and patient
    /// uniqueness; it is reconciled before it is stored.
    pub async fn create_ambulance(&self, body: AmbulanceBody) -> Result<Reply<Ambulance>, ApiError> {
        let mut ambulance: Ambulance = bind(&body)?;
        if needs_generated_id(&ambulance.id) {
            ambulance.id = generate_id();
        }

        let span = self.telemetry.operation_span("CreateAmbulance", &ambulance.id);
        let result = async {
            prepare_new_ambulance(&mut ambulance, (self.clock)())?;
            self.store.create_ambulance(&ambulance).await?;
            tracing::info!(ambulance_id = %ambulance.id, "created ambulance");
            Ok::<_, ApiError>(Reply {
                status: StatusCode::OK,
                body: Some(ambulance),
            })
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }

    pub async fn delete_ambulance(&self, ambulance_id: &str) -> Result<Reply<()>, ApiError> {
        let span = self.telemetry.operation_span("DeleteAmbulance", ambulance_id);
        let result = async {
            self.store.delete_ambulance(ambulance_id).await?;
            tracing::info!(ambulance_id, "deleted ambulance");
            Ok::<_, ApiError>(Reply {
                status: StatusCode::NO_CONTENT,
                body: None,
            })
        }
        .instrument(span.clone())
        .await;
        finish(&span, result)
    }
}

fn prepare_new_ambulance(ambulance: &mut Ambulance, now: OffsetDateTime) -> Result<(), ApiError> {
    let mut ids = HashSet::new();
    let mut patients = HashSet::new();
    for entry in &mut ambulance.waiting_list {
        if needs_generated_id(&entry.id) {
            entry.id = generate_id();
        }
        // Derived by reconciliation only.
        entry.estimated_start = None;
        if entry.patient_id.is_empty() {
            return Err(ApiError::bad_request("Patient ID is required"));
        }
        if !ids.insert(entry.id.clone()) || !patients.insert(entry.patient_id.clone()) {
            return Err(ApiError::bad_request("Duplicate waiting list entry")
                .with_detail(format!("entry {} / patient {}", entry.id, entry.patient_id)));
        }
    }
    ambulance.reconcile_waiting_list(now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambulance_wl_db_memory::InMemoryAmbulanceStore;
    use ambulance_wl_storage::AmbulanceStore;
    use serde_json::json;
    use std::sync::Arc;

    fn api() -> (AmbulanceApi, Arc<InMemoryAmbulanceStore>) {
        let store = Arc::new(InMemoryAmbulanceStore::new());
        (
            AmbulanceApi::new(store.clone(), Telemetry::new("ambulance-wl")),
            store,
        )
    }

    fn body(value: serde_json::Value) -> AmbulanceBody {
        Bytes::from(serde_json::to_vec(&value).unwrap())
    }

    #[tokio::test]
    async fn create_assigns_ids_and_stores_document() {
        let (api, store) = api();
        let reply = api
            .create_ambulance(body(json!({
                "id": "@new",
                "name": "Dr. Bobulova",
                "waitingList": [
                    { "patientId": "P1", "waitingSince": "2024-03-01T08:00:00Z" }
                ]
            })))
            .await
            .unwrap();

        let created = reply.body.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_ne!(created.id, "@new");
        assert!(!created.waiting_list[0].id.is_empty());
        assert!(created.waiting_list[0].estimated_start.is_some());

        let stored = store.fetch_ambulance(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.ambulance, created);
    }

    #[tokio::test]
    async fn create_ignores_client_estimated_start() {
        let (api, _) = api();
        let reply = api
            .create_ambulance(body(json!({
                "id": "bobulova",
                "waitingList": [
                    {
                        "id": "a",
                        "patientId": "P1",
                        "waitingSince": "2024-03-01T08:00:00Z",
                        "estimatedStart": "2999-01-01T00:00:00Z"
                    }
                ]
            })))
            .await
            .unwrap();

        let created = reply.body.unwrap();
        let start = created.waiting_list[0].estimated_start.unwrap();
        assert!(start < time::macros::datetime!(2999-01-01 00:00 UTC));
    }

    #[tokio::test]
    async fn create_with_malformed_body_is_400() {
        let (api, store) = api();
        let err = api
            .create_ambulance(Bytes::from_static(b"{\"id\": 7"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid request body");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_twice_is_409() {
        let (api, _) = api();
        api.create_ambulance(body(json!({ "id": "bobulova" })))
            .await
            .unwrap();
        let err = api
            .create_ambulance(body(json!({ "id": "bobulova" })))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_patients() {
        let (api, store) = api();
        let err = api
            .create_ambulance(body(json!({
                "id": "bobulova",
                "waitingList": [
                    { "id": "a", "patientId": "P1", "waitingSince": "2024-03-01T08:00:00Z" },
                    { "id": "b", "patientId": "P1", "waitingSince": "2024-03-01T08:10:00Z" }
                ]
            })))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_ambulance_is_404() {
        let (api, store) = api();
        api.create_ambulance(body(json!({ "id": "bobulova" })))
            .await
            .unwrap();

        let reply = api.delete_ambulance("bobulova").await.unwrap();
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        assert!(store.is_empty());

        let err = api.delete_ambulance("bobulova").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
