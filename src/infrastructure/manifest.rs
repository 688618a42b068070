//! Photo manifest loading.
//!
//! Reads the `{"photos": [{"id": .., "img_src": ..}]}` shape served by the
//! rover photo feed. Extra fields are ignored.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::entities::{FetchDescriptor, ItemKey};

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// File could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// File is not a valid manifest.
    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// One photo in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoReference {
    /// Photo id.
    pub id: u64,
    /// Image URL.
    #[serde(rename = "img_src")]
    pub image_url: String,
}

impl PhotoReference {
    /// Cache key for this photo.
    #[must_use]
    pub const fn key(&self) -> ItemKey {
        ItemKey(self.id)
    }

    /// Fetch descriptor for this photo.
    #[must_use]
    pub fn descriptor(&self) -> FetchDescriptor {
        FetchDescriptor::new(self.image_url.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    photos: Vec<PhotoReference>,
}

/// Parses a manifest from JSON text.
///
/// # Errors
/// Returns error if the JSON does not match the manifest shape.
pub fn parse_manifest(json: &str) -> Result<Vec<PhotoReference>, ManifestError> {
    let manifest: Manifest = serde_json::from_str(json)?;
    debug!(count = manifest.photos.len(), "Parsed photo manifest");
    Ok(manifest.photos)
}

/// Reads and parses a manifest file.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub async fn load_manifest(path: &Path) -> Result<Vec<PhotoReference>, ManifestError> {
    let json = tokio::fs::read_to_string(path).await?;
    parse_manifest(&json)
}
