use std::net::SocketAddr;
use std::sync::Arc;

use ambulance_wl_db_memory::InMemoryAmbulanceStore;
use ambulance_wl_db_postgres::{PostgresAmbulanceStore, mask_password};
use ambulance_wl_storage::DynAmbulanceStore;
use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::ambulances::AmbulanceApi;
use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::handlers;
use crate::middleware::{self as app_middleware, RequestId};
use crate::observability::Telemetry;
use crate::updater::AmbulanceUpdater;
use crate::waiting_list::WaitingListApi;

/// Component label attached to every operation span.
pub const COMPONENT: &str = "ambulance-wl";

#[derive(Clone)]
pub struct AppState {
    pub store: DynAmbulanceStore,
    pub waiting_list: WaitingListApi,
    pub ambulances: AmbulanceApi,
}

impl AppState {
    pub fn new(store: DynAmbulanceStore) -> Self {
        let telemetry = Telemetry::new(COMPONENT);
        Self {
            waiting_list: WaitingListApi::new(AmbulanceUpdater::new(store.clone()), telemetry),
            ambulances: AmbulanceApi::new(store.clone(), telemetry),
            store,
        }
    }
}

pub struct AmbulanceWlServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Waiting list
        .route(
            "/api/waiting-list/{ambulance_id}/entries",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route(
            "/api/waiting-list/{ambulance_id}/entries/{entry_id}",
            get(handlers::read_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .route(
            "/api/waiting-list/{ambulance_id}/condition",
            get(handlers::list_conditions),
        )
        // Ambulances
        .route("/api/ambulance", post(handlers::create_ambulance))
        .route("/api/ambulance/{ambulance_id}", delete(handlers::delete_ambulance))
        .fallback(handlers::not_found)
        .with_state(state)
        // Middleware stack, innermost first (request id runs before the trace span is made)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            cfg.request_timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<RequestId>()
                        .and_then(|id| id.0.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("http.status_code", res.status().as_u16());
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
}

/// Opens the configured document store.
pub async fn create_store(cfg: &StorageConfig) -> anyhow::Result<DynAmbulanceStore> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory ambulance store");
            Ok(Arc::new(InMemoryAmbulanceStore::new()))
        }
        StorageBackend::Postgres => {
            let backend = cfg.postgres.to_backend_config();
            tracing::info!(
                url = %mask_password(&backend.url),
                pool_size = backend.pool_size,
                min_connections = backend.effective_min_connections(),
                run_migrations = backend.run_migrations,
                "connecting to PostgreSQL"
            );
            let store = PostgresAmbulanceStore::new(backend).await?;
            Ok(Arc::new(store))
        }
    }
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynAmbulanceStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses `store` instead of opening the configured backend.
    pub fn with_store(mut self, store: DynAmbulanceStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> anyhow::Result<AmbulanceWlServer> {
        let store = match self.store {
            Some(store) => store,
            None => create_store(&self.config.storage).await?,
        };
        let app = build_app(AppState::new(store), &self.config);

        Ok(AmbulanceWlServer {
            addr: self.addr,
            app,
        })
    }
}

impl AmbulanceWlServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
