pub mod ambulances;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod updater;
pub mod waiting_list;

pub use ambulances::AmbulanceApi;
pub use config::{
    AppConfig, LogFormat, OtelConfig, PostgresStorageConfig, ServerConfig, StorageBackend,
};
pub use observability::{Telemetry, init_tracing, shutdown_tracing};
pub use server::{AmbulanceWlServer, AppState, ServerBuilder, build_app, create_store};
pub use updater::{AmbulanceUpdater, MutationOutcome, Reply};
pub use waiting_list::WaitingListApi;
