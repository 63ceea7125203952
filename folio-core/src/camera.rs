//! Camera state and containment constraints.
//!
//! Screen coordinates relate to canvas coordinates by
//! `screen = canvas * zoom + pan`.

use serde::{Deserialize, Serialize};

use crate::Rect;

/// Smallest zoom the camera accepts.
pub const MIN_ZOOM: f32 = 0.05;

/// Largest zoom the camera accepts.
pub const MAX_ZOOM: f32 = 8.0;

/// Viewing camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Horizontal screen offset.
    pub pan_x: f32,
    /// Vertical screen offset.
    pub pan_y: f32,
    /// Zoom level (1.0 = 100%).
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

/// How the camera zoom is chosen when it is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialZoom {
    /// Fit the bounds' width to the viewport, never exceeding 100%.
    #[default]
    FitX100,
    /// Keep 100%.
    Default,
}

/// How the constraint restricts panning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintBehavior {
    /// Keep the viewport inside the padded bounds; when the bounds are
    /// smaller than the viewport, pin them at the origin anchor.
    #[default]
    Contain,
    /// Only the initial framing is applied; panning is unrestricted.
    Free,
}

/// Restricts the viewable camera region to a bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConstraints {
    /// Region the camera is held to.
    pub bounds: Rect,
    /// Screen-space padding around the bounds `(x, y)`.
    pub padding: (f32, f32),
    /// Anchor used when the bounds are smaller than the viewport, as a
    /// fraction of the free space `(x, y)`.
    pub origin: (f32, f32),
    /// Framing applied on reset.
    pub initial_zoom: InitialZoom,
    /// Panning restriction.
    pub behavior: ConstraintBehavior,
}

impl CameraConstraints {
    /// Contain `bounds` with the given padding, anchored top-center, framed
    /// "fit width, 100%".
    #[must_use]
    pub fn contain(bounds: Rect, padding_x: f32, padding_y: f32) -> Self {
        Self {
            bounds,
            padding: (padding_x, padding_y),
            origin: (0.5, 0.0),
            initial_zoom: InitialZoom::FitX100,
            behavior: ConstraintBehavior::Contain,
        }
    }

    /// Zoom used when the camera is reset in a viewport of the given size.
    #[must_use]
    pub fn initial_zoom_for(&self, viewport_width: f32) -> f32 {
        match self.initial_zoom {
            InitialZoom::FitX100 => {
                let available = (viewport_width - 2.0 * self.padding.0).max(1.0);
                if self.bounds.width <= 0.0 {
                    1.0
                } else {
                    (available / self.bounds.width).min(1.0).max(MIN_ZOOM)
                }
            }
            InitialZoom::Default => 1.0,
        }
    }

    /// Camera satisfying the constraint right after a reset.
    #[must_use]
    pub fn initial_camera(&self, viewport: (f32, f32)) -> Camera {
        let zoom = self.initial_zoom_for(viewport.0);
        Camera {
            pan_x: self.anchored_pan(viewport.0, self.padding.0, self.origin.0, zoom, Axis::X),
            pan_y: self.anchored_pan(viewport.1, self.padding.1, self.origin.1, zoom, Axis::Y),
            zoom,
        }
    }

    /// Bring `camera` back within the constraint.
    #[must_use]
    pub fn clamp(&self, camera: Camera, viewport: (f32, f32)) -> Camera {
        let zoom = camera.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if self.behavior == ConstraintBehavior::Free {
            return Camera { zoom, ..camera };
        }
        Camera {
            pan_x: self.clamp_axis(
                camera.pan_x,
                viewport.0,
                self.padding.0,
                self.origin.0,
                zoom,
                Axis::X,
            ),
            pan_y: self.clamp_axis(
                camera.pan_y,
                viewport.1,
                self.padding.1,
                self.origin.1,
                zoom,
                Axis::Y,
            ),
            zoom,
        }
    }

    fn extent(&self, axis: Axis) -> (f32, f32) {
        match axis {
            Axis::X => (self.bounds.x, self.bounds.width),
            Axis::Y => (self.bounds.y, self.bounds.height),
        }
    }

    fn anchored_pan(
        &self,
        viewport: f32,
        padding: f32,
        origin: f32,
        zoom: f32,
        axis: Axis,
    ) -> f32 {
        let (start, size) = self.extent(axis);
        let available = viewport - 2.0 * padding;
        padding + (available - size * zoom) * origin - start * zoom
    }

    fn clamp_axis(
        &self,
        pan: f32,
        viewport: f32,
        padding: f32,
        origin: f32,
        zoom: f32,
        axis: Axis,
    ) -> f32 {
        let (start, size) = self.extent(axis);
        if size * zoom <= viewport - 2.0 * padding {
            return self.anchored_pan(viewport, padding, origin, zoom, axis);
        }
        let max = padding - start * zoom;
        let min = viewport - padding - (start + size) * zoom;
        pan.clamp(min, max)
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}
