//! Waiting list entry operations.
//!
//! Each operation is a mutation handed to [`AmbulanceUpdater`]. Body binding,
//! validation and conflict checks all happen inside the mutation, after the
//! ambulance was found, so a missing ambulance wins over a malformed body.

use ambulance_wl_api::ApiError;
use ambulance_wl_core::{
    Ambulance, Condition, WaitingListEntry, WaitingListEntryInput, generate_id,
    needs_generated_id,
};
use axum::body::Bytes;
use axum::http::StatusCode;
use time::OffsetDateTime;
use tracing::Instrument;

use crate::observability::Telemetry;
use crate::updater::{AmbulanceUpdater, MutationOutcome, Reply};

/// Raw request body, decoded as JSON whatever its `Content-Type` says.
pub type EntryBody = Bytes;

#[derive(Clone)]
pub struct WaitingListApi {
    updater: AmbulanceUpdater,
    telemetry: Telemetry,
    clock: fn() -> OffsetDateTime,
}

impl WaitingListApi {
    pub fn new(updater: AmbulanceUpdater, telemetry: Telemetry) -> Self {
        Self {
            updater,
            telemetry,
            clock: ambulance_wl_core::now_utc,
        }
    }

    /// Replaces the wall clock used for defaults and reconciliation.
    pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub async fn create_entry(
        &self,
        ambulance_id: &str,
        body: EntryBody,
    ) -> Result<Reply<WaitingListEntry>, ApiError> {
        let span = self
            .telemetry
            .operation_span("CreateWaitingListEntry", ambulance_id);
        let now = (self.clock)();
        let result = self
            .updater
            .update(ambulance_id, |ambulance| {
                create_mutation(ambulance, body, now)
            })
            .instrument(span.clone())
            .await;
        finish(&span, result)
    }

    pub async fn get_entries(
        &self,
        ambulance_id: &str,
    ) -> Result<Reply<Vec<WaitingListEntry>>, ApiError> {
        let span = self
            .telemetry
            .operation_span("GetWaitingListEntries", ambulance_id);
        let result = self
            .updater
            .update(ambulance_id, |ambulance| {
                Ok(MutationOutcome::read(StatusCode::OK, ambulance.waiting_list))
            })
            .instrument(span.clone())
            .await;
        finish(&span, result)
    }

    pub async fn get_entry(
        &self,
        ambulance_id: &str,
        entry_id: &str,
    ) -> Result<Reply<WaitingListEntry>, ApiError> {
        let span = self
            .telemetry
            .operation_span("GetWaitingListEntry", ambulance_id);
        Telemetry::record_entry(&span, entry_id);
        let result = self
            .updater
            .update(ambulance_id, |ambulance| {
                require_entry_id(entry_id)?;
                let entry = ambulance
                    .entry(entry_id)
                    .cloned()
                    .ok_or_else(entry_not_found)?;
                Ok(MutationOutcome::read(StatusCode::OK, entry))
            })
            .instrument(span.clone())
            .await;
        finish(&span, result)
    }

    pub async fn update_entry(
        &self,
        ambulance_id: &str,
        entry_id: &str,
        body: EntryBody,
    ) -> Result<Reply<WaitingListEntry>, ApiError> {
        let span = self
            .telemetry
            .operation_span("UpdateWaitingListEntry", ambulance_id);
        Telemetry::record_entry(&span, entry_id);
        let now = (self.clock)();
        let result = self
            .updater
            .update(ambulance_id, |ambulance| {
                update_mutation(ambulance, entry_id, body, now)
            })
            .instrument(span.clone())
            .await;
        finish(&span, result)
    }

    pub async fn delete_entry(
        &self,
        ambulance_id: &str,
        entry_id: &str,
    ) -> Result<Reply<()>, ApiError> {
        let span = self
            .telemetry
            .operation_span("DeleteWaitingListEntry", ambulance_id);
        Telemetry::record_entry(&span, entry_id);
        let now = (self.clock)();
        let result = self
            .updater
            .update(ambulance_id, |mut ambulance| {
                require_entry_id(entry_id)?;
                let position = ambulance
                    .entry_position(entry_id)
                    .ok_or_else(entry_not_found)?;
                ambulance.waiting_list.remove(position);
                ambulance.reconcile_waiting_list(now);
                Ok(MutationOutcome::write(
                    ambulance,
                    StatusCode::NO_CONTENT,
                    None,
                ))
            })
            .instrument(span.clone())
            .await;
        finish(&span, result)
    }

    /// Conditions a patient can be admitted with at this ambulance.
    pub async fn get_conditions(
        &self,
        ambulance_id: &str,
    ) -> Result<Reply<Vec<Condition>>, ApiError> {
        let span = self.telemetry.operation_span("GetConditions", ambulance_id);
        let result = self
            .updater
            .update(ambulance_id, |ambulance| {
                Ok(MutationOutcome::read(
                    StatusCode::OK,
                    ambulance.predefined_conditions,
                ))
            })
            .instrument(span.clone())
            .await;
        finish(&span, result)
    }
}

pub(crate) fn finish<T>(
    span: &tracing::Span,
    result: Result<Reply<T>, ApiError>,
) -> Result<Reply<T>, ApiError> {
    match &result {
        Ok(reply) => Telemetry::record_status(span, reply.status),
        Err(err) => {
            Telemetry::record_status(span, err.status_code());
            span.in_scope(|| {
                tracing::warn!(status = err.status_code().as_u16(), error = %err, "operation failed")
            });
        }
    }
    result
}

pub(crate) fn bind<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request("Invalid request body").with_detail(err))
}

fn require_entry_id(entry_id: &str) -> Result<(), ApiError> {
    if entry_id.is_empty() {
        return Err(ApiError::bad_request("Entry ID is required"));
    }
    Ok(())
}

fn entry_not_found() -> ApiError {
    ApiError::not_found("Entry not found")
}

fn create_mutation(
    mut ambulance: Ambulance,
    body: EntryBody,
    now: OffsetDateTime,
) -> Result<MutationOutcome<WaitingListEntry>, ApiError> {
    let mut input: WaitingListEntryInput = bind(&body)?;
    if input.patient_id.is_empty() {
        return Err(ApiError::bad_request("Patient ID is required"));
    }

    let id = if needs_generated_id(&input.id) {
        let id = generate_id();
        tracing::debug!(entry_id = %id, "generating new id for entry");
        id
    } else {
        std::mem::take(&mut input.id)
    };
    tracing::Span::current().record("entry_id", id.as_str());

    if ambulance.conflicts_with(&id, &input.patient_id) {
        return Err(ApiError::conflict("Entry already exists"));
    }

    ambulance
        .waiting_list
        .push(WaitingListEntry::from_input(id.clone(), input, now));
    ambulance.reconcile_waiting_list(now);

    // The list was re-sorted; hand back the reconciled copy.
    let entry = ambulance
        .entry(&id)
        .cloned()
        .ok_or_else(|| ApiError::internal("Failed to save entry"))?;
    tracing::info!(entry_id = %entry.id, "created waiting list entry");
    Ok(MutationOutcome::write(ambulance, StatusCode::OK, Some(entry)))
}

fn update_mutation(
    mut ambulance: Ambulance,
    entry_id: &str,
    body: EntryBody,
    now: OffsetDateTime,
) -> Result<MutationOutcome<WaitingListEntry>, ApiError> {
    let input: WaitingListEntryInput = bind(&body)?;
    require_entry_id(entry_id)?;
    let position = ambulance
        .entry_position(entry_id)
        .ok_or_else(entry_not_found)?;

    // A supplied id replaces the stored one unchecked; it may collide with a
    // sibling entry.
    let entry = &mut ambulance.waiting_list[position];
    entry.merge(&input);
    let (new_id, patient_id, waiting_since) = (
        entry.id.clone(),
        entry.patient_id.clone(),
        entry.waiting_since,
    );

    ambulance.reconcile_waiting_list(now);

    let entry = ambulance
        .waiting_list
        .iter()
        .find(|e| e.id == new_id && e.patient_id == patient_id && e.waiting_since == waiting_since)
        .cloned()
        .ok_or_else(|| ApiError::internal("Failed to save entry"))?;
    Ok(MutationOutcome::write(ambulance, StatusCode::OK, Some(entry)))
}
