use ambulance_wl_api::ApiError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;

use crate::ambulances::AmbulanceBody;
use crate::waiting_list::EntryBody;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    pub status: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Ambulance Waiting List",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.store.health_check().await.map_err(|e| {
        tracing::warn!(
            backend = state.store.backend_name(),
            category = %e.category(),
            error = %e,
            "readiness check failed"
        );
        ApiError::service_unavailable("Storage backend unavailable").with_detail(e)
    })?;
    Ok((StatusCode::OK, Json(HealthResponse { status: "ready" })))
}

// ---- Waiting list entries ----

pub async fn create_entry(
    State(state): State<AppState>,
    Path(ambulance_id): Path<String>,
    body: EntryBody,
) -> impl IntoResponse {
    state.waiting_list.create_entry(&ambulance_id, body).await
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path(ambulance_id): Path<String>,
) -> impl IntoResponse {
    state.waiting_list.get_entries(&ambulance_id).await
}

pub async fn read_entry(
    State(state): State<AppState>,
    Path((ambulance_id, entry_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state.waiting_list.get_entry(&ambulance_id, &entry_id).await
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path((ambulance_id, entry_id)): Path<(String, String)>,
    body: EntryBody,
) -> impl IntoResponse {
    state
        .waiting_list
        .update_entry(&ambulance_id, &entry_id, body)
        .await
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path((ambulance_id, entry_id)): Path<(String, String)>,
) -> impl IntoResponse {
    state.waiting_list.delete_entry(&ambulance_id, &entry_id).await
}

pub async fn list_conditions(
    State(state): State<AppState>,
    Path(ambulance_id): Path<String>,
) -> impl IntoResponse {
    state.waiting_list.get_conditions(&ambulance_id).await
}

// ---- Ambulances ----

pub async fn create_ambulance(
    State(state): State<AppState>,
    body: AmbulanceBody,
) -> impl IntoResponse {
    state.ambulances.create_ambulance(body).await
}

pub async fn delete_ambulance(
    State(state): State<AppState>,
    Path(ambulance_id): Path<String>,
) -> impl IntoResponse {
    state.ambulances.delete_ambulance(&ambulance_id).await
}

/// Fallback for unknown routes, in the same payload shape as every other error.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
