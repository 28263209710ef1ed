//! Subscriber setup for the server.
//!
//! A JSON stdout layer is always installed. With export enabled, spans are
//! additionally batched to an OTLP collector after credential-like and
//! payload-like attributes have been stripped.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracerProvider, SpanData, SpanExporter};
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::ObservabilityConfig;

/// Keys containing any of these fragments never leave the process.
const REDACTED_KEY_FRAGMENTS: [&str; 7] = [
    "secret",
    "token",
    "signature",
    "authorization",
    "credential",
    "payload",
    "data",
];

/// Flushes and shuts down the tracer provider on drop.
///
/// Hold it for the lifetime of `main`.
pub struct OtelGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Tracer provider shutdown failed");
        }
    }
}

/// Wraps an exporter and strips redacted attributes from every span.
#[derive(Debug)]
struct RedactingSpanExporter<E> {
    inner: E,
}

impl<E: SpanExporter> SpanExporter for RedactingSpanExporter<E> {
    async fn export(&self, mut batch: Vec<SpanData>) -> OTelSdkResult {
        batch.iter_mut().for_each(redact_span);
        self.inner.export(batch).await
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        self.inner.shutdown()
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}

fn redact_span(span: &mut SpanData) {
    retain_allowed(&mut span.attributes);
    for event in &mut span.events.events {
        retain_allowed(&mut event.attributes);
    }
}

fn retain_allowed(attributes: &mut Vec<KeyValue>) {
    attributes.retain(|kv| !is_redacted_key(kv.key.as_str()));
}

fn is_redacted_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    REDACTED_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

fn tracer_provider(config: &ObservabilityConfig) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([KeyValue::new("service.version", env!("CARGO_PKG_VERSION"))])
        .build();

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_span_processor(
            BatchSpanProcessor::builder(RedactingSpanExporter { inner: exporter }).build(),
        )
        .build())
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `LOG_LEVEL`. Fails only when export is enabled and
/// the OTLP exporter cannot be built.
pub fn init(config: &ObservabilityConfig) -> anyhow::Result<OtelGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let provider = if config.enabled {
        Some(tracer_provider(config)?)
    } else {
        None
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("lb-server")));

    Registry::default()
        .with(filter)
        .with(otel_layer)
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    Ok(OtelGuard { provider })
}
