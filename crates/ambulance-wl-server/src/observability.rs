// Tracing initialization: env-filtered fmt output plus optional OTLP export.
use std::sync::OnceLock;

use axum::http::StatusCode;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing::Span;
use tracing::field::Empty;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::{LogFormat, LoggingConfig, OtelConfig};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Name of the instrumentation scope used for every exported span.
pub const TRACER_NAME: &str = "ambulance-wl";

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. When OTEL is enabled an
/// OTLP/HTTP exporter is attached; failing to build it is logged and the
/// service keeps running with local logs only.
pub fn init_tracing(logging: &LoggingConfig, otel: &OtelConfig) -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(&logging.level));

    let mut otel_error = None;
    let provider = if otel.enabled {
        match build_tracer_provider(otel) {
            Ok(provider) => Some(provider),
            Err(e) => {
                otel_error = Some(e);
                None
            }
        }
    } else {
        None
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(TRACER_NAME)));

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Text => fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    if let Some(provider) = provider {
        opentelemetry::global::set_tracer_provider(provider.clone());
        let _ = TRACER_PROVIDER.set(provider);
        tracing::info!(
            endpoint = otel.endpoint.as_deref().unwrap_or(""),
            sample_ratio = ?otel.sample_ratio,
            service_name = %otel.service_name,
            "OTEL trace export enabled"
        );
    }
    if let Some(err) = otel_error {
        tracing::warn!(error = %err, "failed to initialize OTEL exporter, continuing without it");
    }
    Ok(())
}

fn build_tracer_provider(otel: &OtelConfig) -> anyhow::Result<SdkTracerProvider> {
    let endpoint = otel
        .endpoint
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| anyhow::anyhow!("otel.endpoint is not set"))?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;

    let sampler = match otel.sample_ratio {
        None => Sampler::AlwaysOn,
        Some(r) if r >= 1.0 => Sampler::AlwaysOn,
        Some(r) if r <= 0.0 => Sampler::AlwaysOff,
        Some(r) => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(r))),
    };

    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".into());
    let mut resource = Resource::builder()
        .with_service_name(otel.service_name.clone())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .with_attribute(KeyValue::new("host.name", host));
    if let Some(env) = &otel.environment {
        resource = resource.with_attribute(KeyValue::new("deployment.environment", env.clone()));
    }

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(sampler)
        .with_resource(resource.build())
        .build())
}

/// Flushes pending spans. Safe to call when OTEL was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("OTEL shutdown failed: {e}");
    }
}

/// Tracer handle handed to each operation group at construction.
///
/// Spans are keyed by operation name, ambulance id and entry id; the global
/// subscriber is only the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telemetry {
    component: &'static str,
}

impl Telemetry {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn operation_span(&self, operation: &'static str, ambulance_id: &str) -> Span {
        tracing::info_span!(
            "ambulance_wl.operation",
            otel.name = operation,
            component = self.component,
            ambulance_id = %ambulance_id,
            entry_id = Empty,
            http.status_code = Empty,
            otel.status_code = Empty,
        )
    }

    pub fn record_entry(span: &Span, entry_id: &str) {
        span.record("entry_id", entry_id);
    }

    /// Marks the span as failed for 4xx/5xx outcomes.
    pub fn record_status(span: &Span, status: StatusCode) {
        span.record("http.status_code", status.as_u16());
        if status.is_client_error() || status.is_server_error() {
            span.record("otel.status_code", "ERROR");
        } else {
            span.record("otel.status_code", "OK");
        }
    }
}
