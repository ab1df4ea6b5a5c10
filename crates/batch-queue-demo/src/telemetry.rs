use opentelemetry::{trace::TraceError, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{self as sdktrace, Tracer},
    Resource,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

use crate::config::TelemetryConfig;

/// Installs the global subscriber. `RUST_LOG` wins over the configured default
/// filter, spans are exported only when an OTLP endpoint is configured.
pub fn setup_telemetry(config: &TelemetryConfig) -> Result<(), TraceError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let otlp_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let tracer = otlp_tracer(config, endpoint)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };
    let exporting = otlp_layer.is_some();

    Registry::default()
        .with(filter)
        .with(otlp_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        service = %config.service_name,
        environment = %config.environment,
        otlp = exporting,
        "Telemetry ready"
    );

    Ok(())
}

fn otlp_tracer(config: &TelemetryConfig, endpoint: &str) -> Result<Tracer, TraceError> {
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])))
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

/// Flushes pending spans before the process exits.
pub fn teardown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
