//! `PostgreSQL` Document Backend

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{Document, DocumentError, DocumentStore};

/// Documents stored as JSONB rows in the `documents` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn add(&self, collection: &str, document: Document) -> Result<String, DocumentError> {
        let id = Uuid::now_v7();

        sqlx::query("INSERT INTO documents (id, collection, data) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(serde_json::Value::Object(document))
            .execute(&self.pool)
            .await?;

        debug!(collection, document_id = %id, "Document inserted");
        Ok(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{to_document, IMAGE_COLLECTION};
    use lb_common::ImageRecord;

    fn record(name: &str) -> ImageRecord {
        ImageRecord {
            name: name.to_string(),
            url: format!("https://storage.cloud.google.com/test-bucket/{name}"),
        }
    }

    #[sqlx::test]
    async fn add_stores_record_as_jsonb(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
        let store = PgDocumentStore::new(pool.clone());

        let id = store
            .add(IMAGE_COLLECTION, to_document(&record("cat.png"))?)
            .await?;

        let (collection, name, url): (String, String, String) = sqlx::query_as(
            "SELECT collection, data->>'ImageName', data->>'URL' FROM documents WHERE id = $1",
        )
        .bind(Uuid::parse_str(&id)?)
        .fetch_one(&pool)
        .await?;

        assert_eq!(collection, "image");
        assert_eq!(name, "cat.png");
        assert_eq!(url, "https://storage.cloud.google.com/test-bucket/cat.png");
        Ok(())
    }

    #[sqlx::test]
    async fn same_name_twice_gives_two_rows(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
        let store = PgDocumentStore::new(pool.clone());

        let first = store
            .add(IMAGE_COLLECTION, to_document(&record("same.png"))?)
            .await?;
        let second = store
            .add(IMAGE_COLLECTION, to_document(&record("same.png"))?)
            .await?;
        assert_ne!(first, second);

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND data->>'ImageName' = $2",
        )
        .bind(IMAGE_COLLECTION)
        .bind("same.png")
        .fetch_one(&pool)
        .await?;
        assert_eq!(count, 2);
        Ok(())
    }
}
