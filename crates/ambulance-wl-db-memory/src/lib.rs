//! In-memory ambulance document store.
//!
//! This crate provides an in-memory implementation of the `AmbulanceStore`
//! trait from `ambulance-wl-storage`, using `DashMap` for concurrent access.
//! It is the default backend for local development and the backend the
//! server's tests run against.
//!
//! # Example
//!
//! ```ignore
//! use ambulance_wl_core::Ambulance;
//! use ambulance_wl_db_memory::InMemoryAmbulanceStore;
//! use ambulance_wl_storage::AmbulanceStore;
//!
//! let store = InMemoryAmbulanceStore::new();
//! store.create_ambulance(&Ambulance::new("bobulova", "Dr. Bobulova")).await?;
//! let stored = store.fetch_ambulance("bobulova").await?;
//! ```

pub mod storage;

pub use ambulance_wl_storage::{AmbulanceStore, StorageError, StoredAmbulance};
pub use storage::InMemoryAmbulanceStore;
