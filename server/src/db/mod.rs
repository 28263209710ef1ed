//! Document Store
//!
//! Schemaless per-collection records. Used as an append-only index of
//! uploaded images.
//!
//! Backends:
//! - Cloud Firestore through its REST API
//! - `PostgreSQL`, one JSONB row per document

pub mod firestore;
pub mod postgres;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

pub use firestore::FirestoreStore;
pub use postgres::PgDocumentStore;

/// Collection holding one document per uploaded image.
pub const IMAGE_COLLECTION: &str = "image";

/// Document body: top-level field names to JSON values.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Document store errors.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport-level failure talking to Firestore.
    #[error("Firestore request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success response from Firestore.
    #[error("Firestore returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the service.
        message: String,
    },

    /// Record did not serialize to a JSON object.
    #[error("Document must be a JSON object")]
    NotAnObject,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only access to a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add a new document to `collection` and return the identifier the store
    /// assigned to it. Existing documents are never checked or replaced.
    async fn add(&self, collection: &str, document: Document) -> Result<String, DocumentError>;
}

/// Serialize a record into a document body.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, DocumentError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotAnObject),
    }
}

/// Create `PostgreSQL` connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        // Prevent hanging requests on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
