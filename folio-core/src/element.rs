//! Canvas elements - the placed objects of a document.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::AssetId;
use crate::{CanvasError, CanvasResult, OrderIndex, Rect};

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "element:{}", self.0)
    }
}

/// Identifier of a container (a canvas page) whose children share one paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(Uuid);

impl ContainerId {
    /// Create a new unique container ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "container:{}", self.0)
    }
}

/// Display resolution tier of an imported page bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Lightweight preview bitmap, used when zoomed out.
    Low,
    /// Full render at the import resolution.
    #[default]
    Medium,
    /// Full render, used when zoomed in.
    High,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

/// The type of content an element contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ElementKind {
    /// A bitmap image backed by an asset.
    Image {
        /// Asset holding the bitmap.
        asset_id: AssetId,
    },

    /// One page of an imported paginated document. An image-type element
    /// whose displayed bitmap follows its quality tier.
    PdfPage {
        /// Asset holding the page renditions.
        asset_id: AssetId,
        /// 1-based page number in the source document.
        page_number: u32,
        /// Identifier shared by every page of one import.
        pdf_id: Uuid,
        /// Currently displayed quality tier.
        quality: QualityTier,
    },

    /// A text label or annotation.
    Text {
        /// Text content.
        content: String,
        /// Font size in pixels.
        font_size: f32,
        /// Text color as hex.
        color: String,
    },

    /// A geometric shape (rectangle, ellipse, ...).
    Geo {
        /// Shape name.
        geo: String,
        /// Stroke color as hex.
        color: String,
    },
}

impl ElementKind {
    /// The asset backing this element, if any.
    #[must_use]
    pub fn asset_id(&self) -> Option<AssetId> {
        match self {
            Self::Image { asset_id } | Self::PdfPage { asset_id, .. } => Some(*asset_id),
            Self::Text { .. } | Self::Geo { .. } => None,
        }
    }

    /// Quality tier of an imported page, `None` for every other kind.
    #[must_use]
    pub fn quality(&self) -> Option<QualityTier> {
        match self {
            Self::PdfPage { quality, .. } => Some(*quality),
            _ => None,
        }
    }

    /// Whether this is an imported page.
    #[must_use]
    pub fn is_pdf_page(&self) -> bool {
        matches!(self, Self::PdfPage { .. })
    }
}

/// Transform for positioning and sizing elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X position (canvas units from left).
    pub x: f32,
    /// Y position (canvas units from top).
    pub y: f32,
    /// Width in canvas units.
    pub width: f32,
    /// Height in canvas units.
    pub height: f32,
    /// Rotation in radians.
    pub rotation: f32,
}

impl Transform {
    /// Axis-aligned placement rectangle (rotation ignored).
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl From<Rect> for Transform {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotation: 0.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
        }
    }
}

/// A placed element with content, transform and paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content type.
    pub kind: ElementKind,
    /// Position and size.
    pub transform: Transform,
    /// Paint order among siblings (lowest paints first).
    pub index: OrderIndex,
    /// Container the element belongs to.
    pub parent: ContainerId,
    /// Whether the element is locked against user edits.
    pub locked: bool,
}

impl Element {
    /// Create a new element of the given kind inside `parent`.
    #[must_use]
    pub fn new(kind: ElementKind, parent: ContainerId) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            transform: Transform::default(),
            index: OrderIndex::default(),
            parent,
            locked: false,
        }
    }

    /// Use a pre-assigned identifier.
    #[must_use]
    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = id;
        self
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the paint-order index.
    #[must_use]
    pub fn with_index(mut self, index: OrderIndex) -> Self {
        self.index = index;
        self
    }

    /// Set whether the element is locked.
    #[must_use]
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Placement rectangle of this element.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.transform.bounds()
    }
}

/// A partial update to one element.
///
/// Only the fields that are `Some` are changed; everything else is carried
/// over from the current record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementUpdate {
    /// Element to update.
    pub id: ElementId,
    /// New position.
    pub position: Option<(f32, f32)>,
    /// New lock state.
    pub locked: Option<bool>,
    /// New paint-order index.
    pub index: Option<OrderIndex>,
    /// New quality tier (imported pages only).
    pub quality: Option<QualityTier>,
}

impl ElementUpdate {
    /// An empty update for `id`.
    #[must_use]
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Move the element.
    #[must_use]
    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.position = Some((x, y));
        self
    }

    /// Change the lock state.
    #[must_use]
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    /// Change the paint-order index.
    #[must_use]
    pub fn index(mut self, index: OrderIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Change the quality tier.
    #[must_use]
    pub fn quality(mut self, quality: QualityTier) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Produce the proposed next record from the current one.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidOperation`] when a quality tier is set on
    /// an element that is not an imported page.
    pub fn apply(&self, current: &Element) -> CanvasResult<Element> {
        let mut next = current.clone();
        if let Some((x, y)) = self.position {
            next.transform.x = x;
            next.transform.y = y;
        }
        if let Some(locked) = self.locked {
            next.locked = locked;
        }
        if let Some(index) = &self.index {
            next.index = index.clone();
        }
        if let Some(tier) = self.quality {
            match &mut next.kind {
                ElementKind::PdfPage { quality, .. } => *quality = tier,
                _ => {
                    return Err(CanvasError::InvalidOperation(format!(
                        "{} has no quality tier",
                        current.id
                    )))
                }
            }
        }
        Ok(next)
    }
}
