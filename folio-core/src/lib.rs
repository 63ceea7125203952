//! # Folio Core
//!
//! The live vector-canvas document that imported pages are placed into.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  folio-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Scene           │  Editor                  │
//! │  - Elements      │  - Batch mutations       │
//! │  - Assets        │  - Side-effect hooks     │
//! │  - Containers    │  - Camera listeners      │
//! ├─────────────────────────────────────────────┤
//! │  OrderIndex      │  Camera                  │
//! │  - Paint order   │  - Constraints           │
//! │  - Fractional    │  - Fit / contain         │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod camera;
pub mod editor;
pub mod element;
pub mod error;
pub mod geometry;
pub mod index;
pub mod scene;
pub mod side_effects;

pub use asset::{Asset, AssetId, AssetSource};
pub use camera::{
    Camera, CameraConstraints, ConstraintBehavior, InitialZoom, MAX_ZOOM, MIN_ZOOM,
};
pub use editor::{Editor, EditorStats, Subscription, WeakEditor};
pub use element::{
    ContainerId, Element, ElementId, ElementKind, ElementUpdate, QualityTier, Transform,
};
pub use error::{CanvasError, CanvasResult};
pub use geometry::Rect;
pub use index::OrderIndex;
pub use scene::Scene;
pub use side_effects::{HookId, SideEffects};

/// Folio core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
