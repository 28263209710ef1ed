//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{bail, Context, Result};
use std::env;

/// Bucket used when `STORAGE_BUCKET` is not set.
pub const DEFAULT_BUCKET: &str = "ct-backend-7776d.appspot.com";

/// Google Cloud Storage XML API endpoint (S3 interoperability mode).
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address, built from `PORT` (e.g., "0.0.0.0:80")
    pub bind_address: String,

    /// LINE channel secret used to verify webhook signatures
    pub channel_secret: String,

    /// LINE channel access token used for outbound calls
    pub channel_token: String,

    /// Messaging API origin
    pub line_api_base_url: String,

    /// Bucket receiving uploaded images
    pub storage_bucket: String,

    /// S3-compatible storage endpoint
    pub storage_endpoint: Option<String>,

    /// Region sent with signed storage requests
    pub storage_region: String,

    /// HMAC interoperability key pair (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
    pub storage_credentials: Option<StorageCredentials>,

    /// Which document store indexes uploaded images
    pub document_store: DocumentStoreConfig,

    /// Maximum request body size in bytes (default: 10MB)
    pub max_upload_size: usize,
}

/// Access key pair for the S3-compatible endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Document store backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreConfig {
    /// Cloud Firestore over its REST API.
    Firestore {
        project_id: String,
        base_url: String,
        /// OAuth bearer token; omitted when talking to the emulator.
        access_token: Option<String>,
    },
    /// `PostgreSQL` table of JSONB documents.
    Postgres { database_url: String },
}

/// Logging and trace export settings.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Export spans over OTLP
    pub enabled: bool,
    /// OTLP gRPC collector endpoint
    pub otlp_endpoint: String,
    /// `service.name` resource attribute
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = var("PORT").unwrap_or_else(|| "80".into());
        let port: u16 = port
            .parse()
            .with_context(|| format!("PORT must be a valid port number, got {port:?}"))?;

        Ok(Self {
            bind_address: format!("0.0.0.0:{port}"),
            channel_secret: required(&var, "CHANNEL_SECRET")?,
            channel_token: required(&var, "CHANNEL_TOKEN")?,
            line_api_base_url: var("LINE_API_BASE_URL")
                .unwrap_or_else(|| "https://api.line.me".into()),
            storage_bucket: var("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.into()),
            storage_endpoint: Some(
                var("STORAGE_ENDPOINT").unwrap_or_else(|| DEFAULT_STORAGE_ENDPOINT.into()),
            ),
            storage_region: var("AWS_REGION").unwrap_or_else(|| "auto".into()),
            storage_credentials: match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
                (Some(access_key_id), Some(secret_access_key)) => Some(StorageCredentials {
                    access_key_id,
                    secret_access_key,
                }),
                _ => None,
            },
            document_store: DocumentStoreConfig::from_lookup(&var)?,
            max_upload_size: var("MAX_UPLOAD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024), // 10MB
        })
    }

    /// Create a default configuration for testing.
    ///
    /// Nothing here points at a live service; tests swap the collaborators
    /// for in-memory fakes.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            channel_secret: "test-channel-secret".into(),
            channel_token: "test-channel-token".into(),
            line_api_base_url: "http://127.0.0.1:9".into(),
            storage_bucket: "test-bucket".into(),
            storage_endpoint: None,
            storage_region: "auto".into(),
            storage_credentials: None,
            document_store: DocumentStoreConfig::Firestore {
                project_id: "test-project".into(),
                base_url: "http://127.0.0.1:8085".into(),
                access_token: None,
            },
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

impl DocumentStoreConfig {
    fn from_lookup<F>(var: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = var("DOCUMENT_STORE").unwrap_or_else(|| "firestore".into());
        match kind.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore {
                project_id: required(var, "FIRESTORE_PROJECT_ID")?,
                base_url: var("FIRESTORE_BASE_URL")
                    .unwrap_or_else(|| "https://firestore.googleapis.com".into()),
                access_token: var("FIRESTORE_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            }),
            "postgres" => Ok(Self::Postgres {
                database_url: required(var, "DATABASE_URL")?,
            }),
            other => bail!("DOCUMENT_STORE must be \"firestore\" or \"postgres\", got {other:?}"),
        }
    }
}

impl ObservabilityConfig {
    /// Load observability settings from environment variables.
    ///
    /// Read separately from [`Config`] so logging is up before the rest of
    /// the configuration is validated.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            enabled: var("OTEL_ENABLED")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| "http://localhost:4317".into()),
            service_name: var("OTEL_SERVICE_NAME").unwrap_or_else(|| "lb-server".into()),
            log_level: var("LOG_LEVEL")
                .unwrap_or_else(|| "lb_server=debug,tower_http=debug".into()),
        }
    }
}

fn required<F>(var: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{key} must be set"))
}
