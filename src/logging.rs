use color_eyre::Result;
use color_eyre::eyre::Context;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const SERVICE_NAME: &str = "music-store";

/// Install the global subscriber.
///
/// `level` is an `EnvFilter` directive such as `info` or `music_store=debug,sea_orm=warn`.
/// With an `otlp_endpoint`, spans are also exported over gRPC; the returned provider
/// must be passed to [`shutdown_tracing`] before exit so buffered spans get flushed.
pub fn init_tracing(level: &str, otlp_endpoint: Option<&str>) -> Result<Option<SdkTracerProvider>> {
    let filter_layer = EnvFilter::try_new(level)
        .wrap_err_with(|| format!("Invalid log level directive: {level}"))?;
    let fmt_layer = tracing_subscriber::fmt::layer().pretty();

    let Some(endpoint) = otlp_endpoint else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
        return Ok(None);
    };

    let provider = otlp_provider(endpoint)?;
    opentelemetry::global::set_tracer_provider(provider.clone());
    let tracer = opentelemetry::global::tracer(SERVICE_NAME);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    tracing::debug!(endpoint, "Exporting spans over OTLP");
    Ok(Some(provider))
}

fn otlp_provider(endpoint: &str) -> Result<SdkTracerProvider> {
    let resource = Resource::builder()
        .with_attributes(vec![KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            SERVICE_NAME,
        )])
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .wrap_err("Failed to create OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

pub fn shutdown_tracing(provider: Option<SdkTracerProvider>) {
    if let Some(provider) = provider
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Failed to flush spans: {e}");
    }
}
