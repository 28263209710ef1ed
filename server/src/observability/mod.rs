//! Structured logging with optional OTLP trace export.
//!
//! ```rust,no_run
//! # use lb_server::{config::ObservabilityConfig, observability};
//! let config = ObservabilityConfig::from_env();
//! // In main(), before any logging:
//! let _otel_guard = observability::init(&config).expect("tracing init");
//! // `_otel_guard` must stay alive until the end of `main`.
//! ```

pub mod tracing;

pub use tracing::{init, OtelGuard};
