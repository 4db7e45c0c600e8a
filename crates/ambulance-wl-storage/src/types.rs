//! Storage types shared by all backends.

use ambulance_wl_core::Ambulance;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An ambulance document as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAmbulance {
    /// The document content.
    pub ambulance: Ambulance,
    /// Monotonic document version, bumped on every replace.
    pub version: i64,
    /// When the document was last written.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    /// When the document was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StoredAmbulance {
    /// Creates the first version of a document.
    #[must_use]
    pub fn new(ambulance: Ambulance) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            ambulance,
            version: 1,
            last_updated: now,
            created_at: now,
        }
    }

    /// Creates the next version of this document with new content.
    #[must_use]
    pub fn next_version(&self, ambulance: Ambulance) -> Self {
        Self {
            ambulance,
            version: self.version + 1,
            last_updated: OffsetDateTime::now_utc(),
            created_at: self.created_at,
        }
    }

    /// The ambulance id this document is stored under.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.ambulance.id
    }
}
