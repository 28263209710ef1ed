//! Object Storage
//!
//! Bucket-addressed blob store for uploaded images.

mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use s3::S3Client;

/// Origin of publicly readable Cloud Storage object URLs.
pub const PUBLIC_URL_BASE: &str = "https://storage.cloud.google.com";

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to write the object.
    #[error("Failed to upload object: {0}")]
    Upload(String),

    /// Storage configuration error.
    #[error("Storage configuration error: {0}")]
    Config(String),
}

/// Write side of a bucket-based object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket objects are written to.
    fn bucket(&self) -> &str;

    /// Write `data` under `key`. Returns once the store has acknowledged the
    /// complete object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;
}

/// Public URL of an object.
pub fn public_url(bucket: &str, key: &str) -> String {
    format!("{PUBLIC_URL_BASE}/{bucket}/{key}")
}

/// Pick a content type for an object from its bytes, then its name.
pub fn detect_content_type(data: &[u8], key: &str) -> String {
    infer::get(data)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| mime_guess::from_path(key).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_format() {
        assert_eq!(
            public_url("ct-backend-7776d.appspot.com", "detected_1700000000.png"),
            "https://storage.cloud.google.com/ct-backend-7776d.appspot.com/detected_1700000000.png"
        );
    }

    #[test]
    fn public_url_keeps_key_verbatim() {
        assert_eq!(
            public_url("b", "my photo.jpg"),
            "https://storage.cloud.google.com/b/my photo.jpg"
        );
    }

    #[test]
    fn content_type_from_magic_bytes() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_content_type(&png, "whatever.bin"), "image/png");
    }

    #[test]
    fn content_type_falls_back_to_extension() {
        assert_eq!(detect_content_type(b"plain", "photo.jpg"), "image/jpeg");
        assert_eq!(
            detect_content_type(b"plain", "noext"),
            "application/octet-stream"
        );
    }
}
