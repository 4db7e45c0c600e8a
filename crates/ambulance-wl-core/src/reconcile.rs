//! Waiting list reconciliation.
//!
//! After any insert, removal or modification the list is re-sorted by arrival
//! (`waitingSince`, then `id`) and every entry's `estimatedStart` is
//! recomputed:
//!
//! - the first entry starts no earlier than its arrival and no earlier than
//!   `now`; a previously computed later start is kept;
//! - each following entry starts when the previous one is expected to finish,
//!   or at its own arrival if that is later.
//!
//! Reconciliation never fails and is idempotent for a fixed `now`.

use time::{Duration, OffsetDateTime};

use crate::model::{Ambulance, WaitingListEntry};

impl Ambulance {
    pub fn reconcile_waiting_list(&mut self, now: OffsetDateTime) {
        reconcile_waiting_list(&mut self.waiting_list, now);
    }
}

pub fn reconcile_waiting_list(entries: &mut [WaitingListEntry], now: OffsetDateTime) {
    entries.sort_by(|left, right| {
        left.waiting_since
            .cmp(&right.waiting_since)
            .then_with(|| left.id.cmp(&right.id))
    });

    let Some((first, rest)) = entries.split_first_mut() else {
        return;
    };

    let first_start = first
        .estimated_start
        .unwrap_or(first.waiting_since)
        .max(first.waiting_since)
        .max(now);
    first.estimated_start = Some(first_start);
    let mut next_start = first_start.saturating_add(expected_duration(first));

    for entry in rest {
        let start = next_start.max(entry.waiting_since);
        entry.estimated_start = Some(start);
        next_start = start.saturating_add(expected_duration(entry));
    }
}

fn expected_duration(entry: &WaitingListEntry) -> Duration {
    Duration::minutes(i64::from(entry.estimated_duration_minutes.max(0)))
}
