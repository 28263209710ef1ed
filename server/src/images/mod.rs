//! Image Publishing
//!
//! Upload endpoints and the pipeline that stores, indexes and broadcasts
//! images.

pub mod pipeline;
pub mod uploads;

use axum::{routing::post, Router};

use crate::api::AppState;

pub use pipeline::{ImagePipeline, PublishError};
pub use uploads::UploadError;

/// Create the upload router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload/image", post(uploads::upload_image))
        .route("/upload/image/base64", post(uploads::upload_image_base64))
        .route("/detect/image", post(uploads::upload_image_base64))
}
