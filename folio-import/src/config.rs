//! Import configuration.

use serde::{Deserialize, Serialize};

use crate::bitmap::EncodingPolicy;
use crate::error::{ImportError, PipelineResult};
use crate::invariants::CameraPolicy;
use crate::pipeline::{DEFAULT_PAGE_GAP, DEFAULT_RECLAIM_EVERY};
use crate::quality::QualityConfig;
use crate::rasterizer::DevicePolicy;
use crate::readiness::RetryPolicy;

/// Lowest accepted resolution multiplier.
pub const MIN_RESOLUTION: f32 = 0.5;

/// Highest accepted resolution multiplier.
pub const MAX_RESOLUTION: f32 = 10.0;

/// Resolution multiplier used when none is requested.
pub const DEFAULT_RESOLUTION: f32 = 1.5;

/// Every tunable of an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Resolution multiplier applied on top of the device pixel ratio.
    pub resolution: f32,
    /// Vertical gap between pages, in canvas units.
    pub page_gap: f32,
    /// Pages between advisory surface reclamations (0 disables).
    pub reclaim_every: u32,
    /// Display device characteristics.
    pub device: DevicePolicy,
    /// Bitmap encoding settings.
    pub encoding: EncodingPolicy,
    /// Budget for waiting on the live editor.
    pub readiness: RetryPolicy,
    /// Camera containment padding.
    pub camera: CameraPolicy,
    /// Quality tier observer timing.
    pub quality: QualityConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            page_gap: DEFAULT_PAGE_GAP,
            reclaim_every: DEFAULT_RECLAIM_EVERY,
            device: DevicePolicy::default(),
            encoding: EncodingPolicy::default(),
            readiness: RetryPolicy::default(),
            camera: CameraPolicy::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl ImportConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidConfig`] if the JSON is malformed or a
    /// value is out of range.
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ImportError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |msg: String| Err(ImportError::InvalidConfig(msg));

        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&self.resolution) {
            return invalid(format!(
                "resolution {} outside {MIN_RESOLUTION}..={MAX_RESOLUTION}",
                self.resolution
            ));
        }
        if !(self.device.device_pixel_ratio.is_finite() && self.device.device_pixel_ratio > 0.0) {
            return invalid(format!(
                "device_pixel_ratio {} must be positive",
                self.device.device_pixel_ratio
            ));
        }
        if !(self.page_gap.is_finite() && self.page_gap >= 0.0) {
            return invalid(format!("page_gap {} must be non-negative", self.page_gap));
        }
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return invalid(format!(
                "jpeg_quality {} outside 1..=100",
                self.encoding.jpeg_quality
            ));
        }
        if !(0.0..=1.0).contains(&self.encoding.color_fraction) {
            return invalid(format!(
                "color_fraction {} outside 0..=1",
                self.encoding.color_fraction
            ));
        }
        if self.encoding.preview_max_dimension == 0 {
            return invalid("preview_max_dimension must be positive".to_string());
        }
        if self.readiness.max_attempts == 0 {
            return invalid("readiness.max_attempts must be positive".to_string());
        }
        if self.quality.poll_interval_ms == 0 {
            return invalid("quality.poll_interval_ms must be positive".to_string());
        }
        Ok(())
    }
}
