//! Bitmap assets referenced by image elements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::QualityTier;

/// Unique identifier for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Create a new unique asset ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

/// One encoded bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSource {
    /// Data URI of the encoded bitmap.
    pub src: String,
    /// MIME type of the encoded bitmap.
    pub mime_type: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A bitmap asset with optional per-tier renditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier.
    pub id: AssetId,
    /// Human-readable name.
    pub name: String,
    /// Full-resolution bitmap.
    pub source: AssetSource,
    /// Alternative bitmaps keyed by the tier that displays them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renditions: BTreeMap<QualityTier, AssetSource>,
}

impl Asset {
    /// Create an asset with a single full-resolution source.
    #[must_use]
    pub fn new(id: AssetId, name: impl Into<String>, source: AssetSource) -> Self {
        Self {
            id,
            name: name.into(),
            source,
            renditions: BTreeMap::new(),
        }
    }

    /// Attach a rendition displayed at `tier`.
    #[must_use]
    pub fn with_rendition(mut self, tier: QualityTier, source: AssetSource) -> Self {
        self.renditions.insert(tier, source);
        self
    }

    /// The bitmap to display at `tier`, falling back to the full source.
    #[must_use]
    pub fn source_for(&self, tier: QualityTier) -> &AssetSource {
        self.renditions.get(&tier).unwrap_or(&self.source)
    }
}
