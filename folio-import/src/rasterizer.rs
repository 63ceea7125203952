//! Page rasterization.
//!
//! [`PageRasterizer`] turns one decoded page into an encoded bitmap. The
//! effective render scale is `device_pixel_ratio × visual_scale`, where the
//! visual scale is the requested resolution, capped at 1.0 on constrained
//! devices. A per-device ceiling on either pixel dimension further shrinks
//! the render; it wins over the requested scale. Logical page bounds ignore
//! that ceiling, so a capped page keeps its layout size.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::bitmap::{downscale_to_fit, EncodingPolicy, RasterBlob};
use crate::decoder::PageHandle;
use crate::error::{ImportError, PipelineResult};
use crate::surface::DrawingSurface;

/// Viewports narrower than this are treated as constrained devices.
pub const CONSTRAINED_VIEWPORT_WIDTH: f32 = 1024.0;

/// Pixel ceiling on constrained devices.
pub const CONSTRAINED_MAX_DIMENSION: u32 = 2048;

/// Pixel ceiling everywhere else.
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

/// Rendering characteristics of the display device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePolicy {
    /// Physical pixels per logical unit.
    pub device_pixel_ratio: f32,
    /// Whether the device is memory-constrained (mobile-class).
    pub constrained: bool,
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            constrained: false,
        }
    }
}

impl DevicePolicy {
    /// Derive the policy from the viewport width.
    #[must_use]
    pub fn from_viewport_width(viewport_width: f32, device_pixel_ratio: f32) -> Self {
        Self {
            device_pixel_ratio,
            constrained: viewport_width < CONSTRAINED_VIEWPORT_WIDTH,
        }
    }

    /// Hard ceiling on either pixel dimension.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        if self.constrained {
            CONSTRAINED_MAX_DIMENSION
        } else {
            DEFAULT_MAX_DIMENSION
        }
    }

    /// The resolution multiplier actually applied.
    #[must_use]
    pub fn visual_scale(&self, resolution: f32) -> f32 {
        if self.constrained {
            resolution.min(1.0)
        } else {
            resolution
        }
    }
}

/// Pixel and logical dimensions of one page render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPlan {
    /// Scale passed to the decoder.
    pub scale: f32,
    /// Bitmap width in pixels.
    pub pixel_width: u32,
    /// Bitmap height in pixels.
    pub pixel_height: u32,
    /// Layout width in canvas units.
    pub logical_width: f32,
    /// Layout height in canvas units.
    pub logical_height: f32,
}

impl RenderPlan {
    /// Plan the render of a page of `size` points.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidScale`] if `resolution` or the device
    /// pixel ratio is not a positive finite number.
    pub fn compute(
        size: (f32, f32),
        resolution: f32,
        device: &DevicePolicy,
    ) -> PipelineResult<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(ImportError::InvalidScale(resolution));
        }
        let dpr = device.device_pixel_ratio;
        if !(dpr.is_finite() && dpr > 0.0) {
            return Err(ImportError::InvalidScale(dpr));
        }

        let scale = dpr * device.visual_scale(resolution);
        let (viewport_width, viewport_height) = (size.0 * scale, size.1 * scale);

        #[allow(clippy::cast_precision_loss)]
        let ceiling = device.max_dimension() as f32;
        let largest = viewport_width.max(viewport_height);
        let canvas_scale = if largest > 0.0 {
            (ceiling / largest).min(1.0)
        } else {
            1.0
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_pixels = |v: f32| ((v * canvas_scale).floor() as u32).max(1);

        Ok(Self {
            scale: scale * canvas_scale,
            pixel_width: to_pixels(viewport_width),
            pixel_height: to_pixels(viewport_height),
            logical_width: viewport_width / dpr,
            logical_height: viewport_height / dpr,
        })
    }
}

/// One rasterized page.
#[derive(Debug, Clone)]
pub struct RasterizedPage {
    /// Full render.
    pub image: RasterBlob,
    /// Down-scaled preview, when the full render exceeds the preview size.
    pub preview: Option<RasterBlob>,
    /// Layout width in canvas units.
    pub width: f32,
    /// Layout height in canvas units.
    pub height: f32,
}

/// Renders decoded pages into encoded bitmaps.
#[derive(Debug, Clone, Default)]
pub struct PageRasterizer {
    device: DevicePolicy,
    encoding: EncodingPolicy,
}

impl PageRasterizer {
    /// Create a rasterizer for `device`.
    #[must_use]
    pub fn new(device: DevicePolicy, encoding: EncodingPolicy) -> Self {
        Self { device, encoding }
    }

    /// Device policy in use.
    #[must_use]
    pub fn device(&self) -> &DevicePolicy {
        &self.device
    }

    /// Render `page` at `resolution` into `surface` and encode the result.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidScale`] for a non-positive resolution,
    /// and whatever the decoder or encoder reports for a failed page.
    pub fn rasterize(
        &self,
        page: &dyn PageHandle,
        resolution: f32,
        surface: &mut DrawingSurface,
    ) -> PipelineResult<RasterizedPage> {
        let plan = RenderPlan::compute(page.size(), resolution, &self.device)?;

        let mut lease = surface.acquire(plan.pixel_width, plan.pixel_height);
        page.render_to(&mut lease, plan.scale)?;

        let format = self.encoding.choose_format(&lease);
        let image = self.encoding.encode(&lease, format)?;
        let preview = self.preview(&lease, format)?;

        tracing::trace!(
            width = plan.pixel_width,
            height = plan.pixel_height,
            format = ?format,
            "Page rasterized"
        );

        Ok(RasterizedPage {
            image,
            preview,
            width: plan.logical_width,
            height: plan.logical_height,
        })
    }

    fn preview(
        &self,
        rendered: &RgbaImage,
        format: crate::bitmap::ImageFormat,
    ) -> PipelineResult<Option<RasterBlob>> {
        downscale_to_fit(rendered, self.encoding.preview_max_dimension)
            .map(|small| self.encoding.encode(&small, format))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: (f32, f32) = (612.0, 792.0);

    #[test]
    fn test_scale_is_dpr_times_resolution() {
        let device = DevicePolicy {
            device_pixel_ratio: 2.0,
            constrained: false,
        };
        let plan = RenderPlan::compute(LETTER, 1.5, &device).expect("plan");
        assert!((plan.scale - 3.0).abs() < 1e-6);
        assert_eq!((plan.pixel_width, plan.pixel_height), (1836, 2376));
        assert!((plan.logical_width - 918.0).abs() < 1e-3);
        assert!((plan.logical_height - 1188.0).abs() < 1e-3);
    }

    #[test]
    fn test_constrained_device_caps_visual_scale() {
        let device = DevicePolicy::from_viewport_width(390.0, 1.0);
        assert!(device.constrained);
        let plan = RenderPlan::compute(LETTER, 3.0, &device).expect("plan");
        assert!((plan.scale - 1.0).abs() < 1e-6);
        assert!((plan.logical_width - 612.0).abs() < 1e-3);
    }

    #[test]
    fn test_ceiling_shrinks_pixels_but_not_layout() {
        let device = DevicePolicy {
            device_pixel_ratio: 1.0,
            constrained: false,
        };
        let plan = RenderPlan::compute(LETTER, 10.0, &device).expect("plan");
        assert!((DEFAULT_MAX_DIMENSION - 1..=DEFAULT_MAX_DIMENSION).contains(&plan.pixel_height));
        assert!(plan.pixel_width < DEFAULT_MAX_DIMENSION);
        assert!((plan.logical_height - 7920.0).abs() < 1e-2);
    }

    #[test]
    fn test_constrained_ceiling() {
        let device = DevicePolicy {
            device_pixel_ratio: 3.0,
            constrained: true,
        };
        let plan = RenderPlan::compute(LETTER, 1.0, &device).expect("plan");
        assert!(
            (CONSTRAINED_MAX_DIMENSION - 1..=CONSTRAINED_MAX_DIMENSION).contains(&plan.pixel_height)
        );
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let device = DevicePolicy::default();
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                RenderPlan::compute(LETTER, bad, &device),
                Err(ImportError::InvalidScale(_))
            ));
        }
    }

    #[test]
    fn test_wide_viewport_is_not_constrained() {
        assert!(!DevicePolicy::from_viewport_width(1024.0, 2.0).constrained);
    }
}
