//! Image Types

use serde::{Deserialize, Serialize};

/// Lookup entry for an uploaded image.
///
/// Stored as-is in the `image` document collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Object name inside the bucket.
    #[serde(rename = "ImageName")]
    pub name: String,
    /// Public URL of the object.
    #[serde(rename = "URL")]
    pub url: String,
}
