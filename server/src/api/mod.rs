//! API Router and Application State
//!
//! Central routing configuration and shared state.

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::{
    config::Config,
    db::DocumentStore,
    images::{self, ImagePipeline},
    line::{self, ChatClient},
    storage::ObjectStore,
};

/// Shared application state.
///
/// Every handle is created once at startup and used read-only by all requests.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Messaging API client used for replies
    pub chat: Arc<dyn ChatClient>,
    /// Image publication pipeline
    pub images: ImagePipeline,
}

/// Collaborators handed to [`AppState::new`].
pub struct AppStateConfig {
    pub config: Config,
    pub chat: Arc<dyn ChatClient>,
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(cfg: AppStateConfig) -> Self {
        let images = ImagePipeline::new(cfg.objects, cfg.documents, cfg.chat.clone());
        Self {
            config: Arc::new(cfg.config),
            chat: cfg.chat,
            images,
        }
    }
}

/// OpenAPI document for the HTTP surface.
#[derive(OpenApi)]
#[openapi(
    info(title = "LINE Image Bot", description = "Webhook callback and image upload API"),
    paths(
        home,
        line::callback::callback,
        images::uploads::upload_image,
        images::uploads::upload_image_base64,
    ),
    components(schemas(crate::error::ErrorResponse, images::uploads::Base64ImageRequest)),
)]
pub struct ApiDoc;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let max_upload_size = state.config.max_upload_size;

    Router::new()
        .route("/", get(home))
        .route("/callback", post(line::callback::callback))
        .merge(images::router())
        .route("/api-docs/openapi.json", get(openapi))
        // Middleware
        .layer(TraceLayer::new_for_http())
        // Raise the body limit for uploads (default is 2MB)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .with_state(state)
}

/// Liveness greeting.
///
/// GET /
#[utoipa::path(get, path = "/", tag = "health", responses((status = 200, body = String)))]
async fn home() -> Json<&'static str> {
    Json("Hello World!")
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
