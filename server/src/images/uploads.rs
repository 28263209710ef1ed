//! Image Upload Handlers
//!
//! Two entry encodings that both end in [`ImagePipeline::publish`]:
//! a multipart form field, or a JSON body carrying base64 data.
//!
//! [`ImagePipeline::publish`]: super::pipeline::ImagePipeline::publish

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::pipeline::PublishError;
use crate::api::AppState;
use crate::error::error_response;

/// Multipart field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// Body of a successful upload response.
pub const UPLOAD_SUCCESS: &str = "Create image success.";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while accepting an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No usable file in the request.
    #[error("{0}")]
    UploadInputMissing(String),

    /// Request body could not be decoded.
    #[error("{0}")]
    MalformedRequest(String),

    /// A pipeline step failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UploadInputMissing(_) => StatusCode::BAD_REQUEST,
            Self::MalformedRequest(_) | Self::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// JSON upload body.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct Base64ImageRequest {
    /// Base64 image data, optionally prefixed with a data-URL header
    /// (`data:image/png;base64,`).
    #[serde(rename = "Data", alias = "data")]
    pub data: String,
    /// Display name supplied by the client.
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
}

/// Image bytes in one of the accepted encodings.
#[derive(Debug)]
pub enum UploadInput {
    /// Raw file bytes and the filename from the form.
    Multipart { data: Bytes, filename: String },
    /// Base64 text from a JSON body.
    Base64 { payload: String, name: String },
}

impl UploadInput {
    /// Decode into image bytes and the destination object name.
    ///
    /// Multipart filenames are used verbatim. Base64 uploads are named
    /// `detected_<unix seconds>.png` from `now`.
    pub fn into_object(self, now: DateTime<Utc>) -> Result<(Bytes, String), UploadError> {
        match self {
            Self::Multipart { data, filename } => Ok((data, filename)),
            Self::Base64 { payload, name } => {
                let data = decode_base64_payload(&payload)
                    .map_err(|e| UploadError::MalformedRequest(format!("Invalid base64 data: {e}")))?;
                let object_name = detected_object_name(now);
                info!(display_name = %name, object_name = %object_name, "Decoded base64 upload");
                Ok((Bytes::from(data), object_name))
            }
        }
    }
}

/// Decode base64 image data.
///
/// Everything up to and including the first comma is a data-URL header and is
/// dropped; a payload without a comma is decoded whole. ASCII whitespace is
/// ignored.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = payload.split_once(',').map_or(payload, |(_, rest)| rest);
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}

/// Object name for a base64 upload received at `now`.
pub fn detected_object_name(now: DateTime<Utc>) -> String {
    format!("detected_{}.png", now.timestamp())
}

// ============================================================================
// Handlers
// ============================================================================

/// Upload an image from a multipart form.
///
/// POST /upload/image
///
/// Expects multipart form with:
/// - `image`: The file data; its filename becomes the object name
#[utoipa::path(
    post,
    path = "/upload/image",
    tag = "uploads",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = String, description = "Image stored, indexed and broadcast"),
        (status = 400, body = crate::error::ErrorResponse, description = "Missing or invalid file"),
        (status = 500, body = crate::error::ErrorResponse, description = "Storage, database or broadcast failure"),
    ),
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<&'static str>), UploadError> {
    let mut multipart =
        multipart.map_err(|e| UploadError::UploadInputMissing(e.body_text()))?;

    let mut input: Option<UploadInput> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(UploadError::UploadInputMissing(e.body_text())),
        };

        if field.name() != Some(IMAGE_FIELD) {
            // Ignore unknown fields
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(String::from)
            .ok_or_else(|| {
                UploadError::UploadInputMissing("Image field has no filename".to_string())
            })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| UploadError::UploadInputMissing(e.body_text()))?;

        input = Some(UploadInput::Multipart { data, filename });
        break;
    }

    let input = input.ok_or_else(|| {
        UploadError::UploadInputMissing(format!("No file in form field \"{IMAGE_FIELD}\""))
    })?;

    publish_input(&state, input).await
}

/// Upload an image from base64 data.
///
/// POST /upload/image/base64 (also served at /detect/image)
#[utoipa::path(
    post,
    path = "/upload/image/base64",
    tag = "uploads",
    request_body = Base64ImageRequest,
    responses(
        (status = 201, body = String, description = "Image stored, indexed and broadcast"),
        (status = 500, body = crate::error::ErrorResponse, description = "Decode, storage, database or broadcast failure"),
    ),
)]
#[tracing::instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn upload_image_base64(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<&'static str>), UploadError> {
    let request: Base64ImageRequest = serde_json::from_slice(&body)
        .map_err(|e| UploadError::MalformedRequest(format!("Invalid JSON body: {e}")))?;

    let input = UploadInput::Base64 {
        payload: request.data,
        name: request.name,
    };

    publish_input(&state, input).await
}

async fn publish_input(
    state: &AppState,
    input: UploadInput,
) -> Result<(StatusCode, Json<&'static str>), UploadError> {
    let (data, object_name) = input.into_object(Utc::now())?;
    state.images.publish(data, &object_name).await?;
    Ok((StatusCode::CREATED, Json(UPLOAD_SUCCESS)))
}
