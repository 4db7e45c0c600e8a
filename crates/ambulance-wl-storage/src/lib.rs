//! # ambulance-wl-storage
//!
//! Storage abstraction layer for the ambulance waiting list service.
//!
//! This crate defines the contract every document store backend fulfils. It
//! does not contain any implementations - those live in
//! `ambulance-wl-db-memory` and `ambulance-wl-db-postgres`.
//!
//! ## Overview
//!
//! Each ambulance, with its whole waiting list, is one document. The main
//! trait is [`AmbulanceStore`]:
//! - fetch a document by ambulance id
//! - replace a document wholesale, optionally guarded by the version it was
//!   fetched at
//! - create and delete documents
//!
//! ## Example
//!
//! ```ignore
//! use ambulance_wl_storage::{AmbulanceStore, StorageError};
//!
//! async fn rename(store: &dyn AmbulanceStore, id: &str) -> Result<(), StorageError> {
//!     let stored = store
//!         .fetch_ambulance(id)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found(id))?;
//!
//!     let mut ambulance = stored.ambulance;
//!     ambulance.name = "Ambulance North".into();
//!     store.replace_ambulance(&ambulance, Some(stored.version)).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::AmbulanceStore;
pub use types::StoredAmbulance;

/// Type alias for a shareable store trait object.
pub type DynAmbulanceStore = std::sync::Arc<dyn AmbulanceStore>;
