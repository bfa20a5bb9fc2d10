use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging for a service, with optional OTLP span
/// export.
///
/// - `service_name`: identifies this component (e.g. "stratus-registry")
/// - `otlp_endpoint`: if `Some`, spans are exported via OTLP/HTTP to this
///   base URL; the exporter appends `/v1/traces`.
/// - `otlp_token`: bearer token for the collector, if it requires one.
///
/// Returns the tracer provider when OTLP export is enabled; the caller keeps
/// it alive and calls `shutdown()` before exit.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    otlp_token: Option<&str>,
) -> Option<TracerProvider> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    let Some(endpoint) = otlp_endpoint else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    let mut headers = std::collections::HashMap::new();
    if let Some(token) = otlp_token.filter(|t| !t.is_empty()) {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_headers(headers)
        .build()
    {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("failed to create OTLP exporter: {err}, logging to stdout only");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracing::info!(endpoint, service_name, "OTLP tracing enabled");
    Some(provider)
}
