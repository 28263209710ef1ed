//! S3 Storage Client
//!
//! Writes objects through the S3 API. Google Cloud Storage is reached through
//! its XML interoperability endpoint with HMAC keys; any other S3-compatible
//! backend works the same way.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::{
    config::{
        Credentials, IdentityCache, RequestChecksumCalculation, ResponseChecksumValidation,
        SharedCredentialsProvider, StalledStreamProtectionConfig,
    },
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use tracing::info;

use super::{ObjectStore, StorageError};
use crate::config::Config;

/// S3 client wrapper bound to a single bucket.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    ///
    /// Uses path-style addressing when a custom endpoint is configured.
    pub fn new(config: &Config) -> Self {
        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .region(Region::new(config.storage_region.clone()))
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .identity_cache(IdentityCache::no_cache())
            // The interoperability API rejects the SDK's default flexible checksums
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

        if let Some(keys) = &config.storage_credentials {
            let credentials = Credentials::new(
                keys.access_key_id.clone(),
                keys.secret_access_key.clone(),
                None,
                None,
                "environment",
            );
            s3_config_builder =
                s3_config_builder.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        if let Some(endpoint) = &config.storage_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.storage_bucket,
            endpoint = ?config.storage_endpoint,
            "Storage client initialized"
        );

        Self {
            client,
            bucket: config.storage_bucket.clone(),
        }
    }

    /// Check if the bucket is accessible (health check).
    pub async fn health_check(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::Config(format!("Bucket not accessible: {}", DisplayErrorContext(&e)))
            })?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
