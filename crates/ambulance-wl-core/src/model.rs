//! Waiting list document model.
//!
//! An [`Ambulance`] is stored as a single document and owns its waiting list
//! exclusively. Field names follow the public JSON API (camelCase).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::ZERO_TIMESTAMP;

/// A medical condition a patient can be waiting with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub typical_duration_minutes: i32,
}

/// One patient's record on an ambulance's waiting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingListEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub waiting_since: OffsetDateTime,
    /// Derived by reconciliation; never taken from client input.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_start: Option<OffsetDateTime>,
    #[serde(default)]
    pub estimated_duration_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl WaitingListEntry {
    /// Builds a new entry from client input. The caller decides the id.
    pub fn from_input(id: String, input: WaitingListEntryInput, now: OffsetDateTime) -> Self {
        let waiting_since = input
            .waiting_since
            .filter(|since| *since > ZERO_TIMESTAMP)
            .unwrap_or(now);
        Self {
            id,
            name: input.name,
            patient_id: input.patient_id,
            waiting_since,
            estimated_start: None,
            estimated_duration_minutes: input.estimated_duration_minutes,
            condition: input.condition,
        }
    }

    /// Overwrites the fields the request actually supplied.
    ///
    /// Empty strings, a missing or zero `waitingSince` and non-positive
    /// durations count as "not supplied" and leave the stored value intact.
    /// The `id` is replaced without any uniqueness check against sibling
    /// entries; callers that need one must do it themselves.
    pub fn merge(&mut self, input: &WaitingListEntryInput) {
        if !input.patient_id.is_empty() {
            self.patient_id = input.patient_id.clone();
        }
        if !input.id.is_empty() {
            self.id = input.id.clone();
        }
        if let Some(since) = input.waiting_since.filter(|since| *since > ZERO_TIMESTAMP) {
            self.waiting_since = since;
        }
        if input.estimated_duration_minutes > 0 {
            self.estimated_duration_minutes = input.estimated_duration_minutes;
        }
    }
}

/// Request body for creating or updating an entry.
///
/// Every field is optional on the wire so that partial updates bind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WaitingListEntryInput {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub waiting_since: Option<OffsetDateTime>,
    #[serde(default)]
    pub estimated_duration_minutes: i32,
    #[serde(default)]
    pub condition: Option<Condition>,
}

/// Aggregate root: one ambulance and its waiting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Ambulance {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub room_number: String,
    #[serde(default)]
    pub waiting_list: Vec<WaitingListEntry>,
    #[serde(default)]
    pub predefined_conditions: Vec<Condition>,
}

impl Ambulance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Position of the entry with the given id.
    pub fn entry_position(&self, entry_id: &str) -> Option<usize> {
        self.waiting_list.iter().position(|entry| entry.id == entry_id)
    }

    pub fn entry(&self, entry_id: &str) -> Option<&WaitingListEntry> {
        self.waiting_list.iter().find(|entry| entry.id == entry_id)
    }

    /// Returns `true` if an entry already uses `entry_id` or `patient_id`.
    pub fn conflicts_with(&self, entry_id: &str, patient_id: &str) -> bool {
        self.waiting_list
            .iter()
            .any(|entry| entry.id == entry_id || entry.patient_id == patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn entry(id: &str, patient_id: &str) -> WaitingListEntry {
        WaitingListEntry {
            id: id.into(),
            name: String::new(),
            patient_id: patient_id.into(),
            waiting_since: datetime!(2024-03-01 08:00 UTC),
            estimated_start: None,
            estimated_duration_minutes: 15,
            condition: None,
        }
    }

    #[test]
    fn entry_uses_camel_case_on_the_wire() {
        let value = serde_json::to_value(entry("e1", "p1")).unwrap();
        assert_eq!(value["patientId"], "p1");
        assert_eq!(value["waitingSince"], "2024-03-01T08:00:00Z");
        assert_eq!(value["estimatedDurationMinutes"], 15);
        assert!(value.get("estimatedStart").is_none());
    }

    #[test]
    fn input_binds_partial_bodies() {
        let input: WaitingListEntryInput =
            serde_json::from_value(json!({ "waitingSince": "2024-03-01T09:30:00Z" })).unwrap();
        assert!(input.id.is_empty());
        assert!(input.patient_id.is_empty());
        assert_eq!(input.waiting_since, Some(datetime!(2024-03-01 09:30 UTC)));
        assert_eq!(input.estimated_duration_minutes, 0);
    }

    #[test]
    fn input_rejects_malformed_timestamps() {
        let result: Result<WaitingListEntryInput, _> =
            serde_json::from_value(json!({ "waitingSince": "yesterday" }));
        assert!(result.is_err());
    }

    #[test]
    fn merge_with_only_waiting_since_touches_nothing_else() {
        let mut stored = entry("e1", "p1");
        let input = WaitingListEntryInput {
            waiting_since: Some(datetime!(2024-03-01 10:00 UTC)),
            ..Default::default()
        };
        stored.merge(&input);
        assert_eq!(stored.id, "e1");
        assert_eq!(stored.patient_id, "p1");
        assert_eq!(stored.estimated_duration_minutes, 15);
        assert_eq!(stored.waiting_since, datetime!(2024-03-01 10:00 UTC));
    }

    #[test]
    fn merge_treats_empty_and_zero_values_as_absent() {
        let mut stored = entry("e1", "p1");
        let input = WaitingListEntryInput {
            waiting_since: Some(ZERO_TIMESTAMP),
            estimated_duration_minutes: -5,
            ..Default::default()
        };
        stored.merge(&input);
        assert_eq!(stored, entry("e1", "p1"));
    }

    #[test]
    fn merge_overwrites_supplied_fields() {
        let mut stored = entry("e1", "p1");
        let input = WaitingListEntryInput {
            id: "e9".into(),
            patient_id: "p9".into(),
            estimated_duration_minutes: 40,
            ..Default::default()
        };
        stored.merge(&input);
        assert_eq!(stored.id, "e9");
        assert_eq!(stored.patient_id, "p9");
        assert_eq!(stored.estimated_duration_minutes, 40);
    }

    #[test]
    fn from_input_defaults_missing_arrival_to_now() {
        let now = datetime!(2024-03-02 12:00 UTC);
        let input = WaitingListEntryInput {
            patient_id: "p1".into(),
            ..Default::default()
        };
        let created = WaitingListEntry::from_input("e1".into(), input, now);
        assert_eq!(created.waiting_since, now);
        assert_eq!(created.estimated_start, None);
    }

    #[test]
    fn conflicts_match_on_id_or_patient() {
        let mut ambulance = Ambulance::new("a1", "Ambulance");
        ambulance.waiting_list.push(entry("e1", "p1"));
        assert!(ambulance.conflicts_with("e1", "other"));
        assert!(ambulance.conflicts_with("other", "p1"));
        assert!(!ambulance.conflicts_with("e2", "p2"));
        assert_eq!(ambulance.entry_position("e1"), Some(0));
        assert!(ambulance.entry("missing").is_none());
    }

    #[test]
    fn ambulance_document_defaults_missing_lists() {
        let ambulance: Ambulance =
            serde_json::from_value(json!({ "id": "a1", "name": "Ambulance" })).unwrap();
        assert!(ambulance.waiting_list.is_empty());
        assert!(ambulance.predefined_conditions.is_empty());
    }
}
