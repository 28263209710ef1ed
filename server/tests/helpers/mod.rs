//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router with
//! in-memory stand-ins for the chat platform, the bucket and the document
//! store. Each fake can be switched to fail so error paths are reachable.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] when a real HTTP peer is needed, e.g. to point
//! `LineClient` or `FirestoreStore` at a local imitation of the remote API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use lb_common::SendMessage;
use lb_server::api::{create_router, AppState, AppStateConfig};
use lb_server::config::Config;
use lb_server::db::{Document, DocumentError, DocumentStore};
use lb_server::line::signing::{sign_payload, SIGNATURE_HEADER};
use lb_server::line::{ChatClient, LineError};
use lb_server::storage::{ObjectStore, StorageError};
use tokio::task::JoinHandle;
use tower::ServiceExt;

// ============================================================================
// Fakes
// ============================================================================

/// Chat client that records every outbound call.
#[derive(Default)]
pub struct RecordingChat {
    pub replies: Mutex<Vec<(String, Vec<SendMessage>)>>,
    pub broadcasts: Mutex<Vec<Vec<SendMessage>>>,
    pub fail_replies: AtomicBool,
    pub fail_broadcasts: AtomicBool,
}

impl RecordingChat {
    pub fn replies(&self) -> Vec<(String, Vec<SendMessage>)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<Vec<SendMessage>> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn reply(&self, reply_token: &str, messages: Vec<SendMessage>) -> Result<(), LineError> {
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(LineError::Api {
                status: 400,
                message: "Invalid reply token".into(),
            });
        }
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages));
        Ok(())
    }

    async fn broadcast(&self, messages: Vec<SendMessage>) -> Result<(), LineError> {
        if self.fail_broadcasts.load(Ordering::SeqCst) {
            return Err(LineError::Api {
                status: 429,
                message: "You have reached your monthly limit.".into(),
            });
        }
        self.broadcasts.lock().unwrap().push(messages);
        Ok(())
    }
}

/// A stored object: bytes and content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Bucket kept in memory.
pub struct MemoryObjects {
    pub bucket: String,
    pub objects: Mutex<HashMap<String, StoredObject>>,
    pub fail: AtomicBool,
}

impl MemoryObjects {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Upload("bucket unavailable".into()));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

/// Document store kept in memory, in insertion order.
#[derive(Default)]
pub struct MemoryDocuments {
    pub documents: Mutex<Vec<(String, String, Document)>>,
    pub fail: AtomicBool,
    next_id: AtomicUsize,
}

impl MemoryDocuments {
    /// Documents of one collection.
    pub fn collection(&self, name: &str) -> Vec<Document> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .filter(|(collection, _, _)| collection == name)
            .map(|(_, _, doc)| doc.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn add(&self, collection: &str, document: Document) -> Result<String, DocumentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DocumentError::Api {
                status: 503,
                message: "The service is currently unavailable.".into(),
            });
        }
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.documents
            .lock()
            .unwrap()
            .push((collection.to_string(), id.clone(), document));
        Ok(id)
    }
}

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
    pub chat: Arc<RecordingChat>,
    pub objects: Arc<MemoryObjects>,
    pub documents: Arc<MemoryDocuments>,
}

impl TestApp {
    /// Create a new test app with fresh fakes.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let chat = Arc::new(RecordingChat::default());
        let objects = Arc::new(MemoryObjects::new(&config.storage_bucket));
        let documents = Arc::new(MemoryDocuments::default());

        Self::with_chat(config, chat.clone(), chat, objects, documents)
    }

    /// Create a test app around an arbitrary chat client.
    ///
    /// `recorder` is what `self.chat` exposes; pass the same fake twice unless
    /// `chat` is a real client.
    pub fn with_chat(
        config: Config,
        chat: Arc<dyn ChatClient>,
        recorder: Arc<RecordingChat>,
        objects: Arc<MemoryObjects>,
        documents: Arc<MemoryDocuments>,
    ) -> Self {
        let state = AppState::new(AppStateConfig {
            config: config.clone(),
            chat,
            objects: objects.clone(),
            documents: documents.clone(),
        });
        let router = create_router(state);

        Self {
            router,
            config: Arc::new(config),
            chat: recorder,
            objects,
            documents,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Build a `/callback` request signed with the test channel secret.
    pub fn signed_callback(&self, body: &serde_json::Value) -> Request<Body> {
        let raw = serde_json::to_vec(body).unwrap();
        let signature = sign_payload(&self.config.channel_secret, &raw);
        Self::request(Method::POST, "/callback")
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(raw))
            .unwrap()
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

// ============================================================================
// Body helpers
// ============================================================================

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

/// Build a single-file multipart body and its content type header value.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}
