//! Image Publication Pipeline
//!
//! store object → public URL → index record → broadcast.
//!
//! Steps run strictly in that order and the first failure aborts the rest.
//! Completed steps are not rolled back: an object may exist without a record,
//! and a record may exist without a broadcast.

use std::sync::Arc;

use bytes::Bytes;
use lb_common::{ImageRecord, SendMessage};
use thiserror::Error;
use tracing::{error, info};

use crate::db::{to_document, DocumentError, DocumentStore, IMAGE_COLLECTION};
use crate::line::{ChatClient, LineError};
use crate::storage::{detect_content_type, public_url, ObjectStore, StorageError};

/// Errors from a publication run, one per failing step.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Object write failed; nothing was recorded or broadcast.
    #[error(transparent)]
    StorageWriteFailed(#[from] StorageError),

    /// Object exists but the index record was not written.
    #[error(transparent)]
    RecordPersistFailed(#[from] DocumentError),

    /// Object and record exist but subscribers were not notified.
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(#[from] LineError),
}

/// Shared handles to the three collaborators of a publication.
#[derive(Clone)]
pub struct ImagePipeline {
    objects: Arc<dyn ObjectStore>,
    documents: Arc<dyn DocumentStore>,
    chat: Arc<dyn ChatClient>,
}

impl ImagePipeline {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            objects,
            documents,
            chat,
        }
    }

    /// Publish image bytes under `object_name`.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn publish(
        &self,
        data: Bytes,
        object_name: &str,
    ) -> Result<ImageRecord, PublishError> {
        let content_type = detect_content_type(&data, object_name);

        self.objects
            .put(object_name, data, &content_type)
            .await
            .inspect_err(|e| error!(error = %e, "Object write failed"))?;

        let record = ImageRecord {
            name: object_name.to_string(),
            url: public_url(self.objects.bucket(), object_name),
        };

        let document_id = self
            .documents
            .add(IMAGE_COLLECTION, to_document(&record)?)
            .await
            .inspect_err(|e| error!(error = %e, "Stored object has no index record"))?;

        self.chat
            .broadcast(vec![SendMessage::image(record.url.clone())])
            .await
            .inspect_err(|e| error!(error = %e, document_id = %document_id, "Image broadcast failed"))?;

        info!(
            document_id = %document_id,
            url = %record.url,
            content_type = %content_type,
            "Image published"
        );

        Ok(record)
    }
}
