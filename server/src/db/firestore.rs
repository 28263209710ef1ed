//! Firestore REST Backend
//!
//! Creates documents with `POST .../documents/{collection}`; Firestore picks
//! the document ID. Field values use the typed `Value` encoding of the v1 API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Document, DocumentError, DocumentStore};

/// Firestore client bound to the `(default)` database of one project.
#[derive(Clone)]
pub struct FirestoreStore {
    http: reqwest::Client,
    documents_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorStatus,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    message: String,
}

impl FirestoreStore {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        project_id: &str,
        access_token: Option<String>,
    ) -> Self {
        let documents_url = format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            base_url.trim_end_matches('/'),
            project_id
        );
        Self {
            http,
            documents_url,
            access_token,
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(&self, collection: &str, document: Document) -> Result<String, DocumentError> {
        let url = format!("{}/{}", self.documents_url, collection);
        let body = json!({ "fields": encode_fields(document) });

        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(text);
            return Err(DocumentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedDocument = resp.json().await?;
        let id = document_id(&created.name).to_string();
        debug!(collection, document_id = %id, "Firestore document created");
        Ok(id)
    }
}

/// Last path segment of a document resource name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn encode_fields(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(k, v)| (k, encode_value(v)))
            .collect(),
    )
}

/// Encode a JSON value as a Firestore `Value`.
fn encode_value(value: Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.into_iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}
