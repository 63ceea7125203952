//! Bitmap encoding utilities.
//!
//! Rendered pages are encoded either as PNG (lossless, for text and line
//! art) or JPEG (lossy, for colored content) and carried as data URIs.

use std::io::Cursor;

use base64::Engine;
use image::{imageops, ImageEncoder, Rgb, RgbImage, RgbaImage};

use crate::error::{ImportError, PipelineResult};

/// Supported bitmap encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG, lossless.
    Png,
    /// JPEG, lossy, no alpha.
    Jpeg,
}

impl ImageFormat {
    /// MIME type of the encoding.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        None
    }
}

/// An encoded bitmap with its pixel dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterBlob {
    /// Encoded bytes.
    pub data: Vec<u8>,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl std::fmt::Debug for RasterBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterBlob")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl RasterBlob {
    /// Encode as a `data:` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{encoded}", self.format.mime_type())
    }
}

/// Settings of the content-driven encoder.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncodingPolicy {
    /// JPEG quality 1-100 (default: 85).
    pub jpeg_quality: u8,
    /// Largest channel difference still considered gray.
    pub color_threshold: u8,
    /// Fraction of sampled pixels above which a page counts as colored.
    pub color_fraction: f32,
    /// Longest side of the preview rendition in pixels.
    pub preview_max_dimension: u32,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            color_threshold: 5,
            color_fraction: 0.05,
            preview_max_dimension: 512,
        }
    }
}

impl EncodingPolicy {
    /// Pick the encoding for `image` from its center block.
    #[must_use]
    pub fn choose_format(&self, image: &RgbaImage) -> ImageFormat {
        if has_color_content(image, self.color_threshold, self.color_fraction) {
            ImageFormat::Jpeg
        } else {
            ImageFormat::Png
        }
    }

    /// Encode `image` in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Encode`] if the encoder fails.
    pub fn encode(&self, image: &RgbaImage, format: ImageFormat) -> PipelineResult<RasterBlob> {
        match format {
            ImageFormat::Png => encode_png(image),
            ImageFormat::Jpeg => encode_jpeg(image, self.jpeg_quality),
        }
    }
}

/// Whether more than `fraction` of the pixels sampled from the center block
/// have channels differing by more than `threshold`.
///
/// The block is a square of side `min(width, height) / 4` around the image
/// center, sampled every 4th pixel in both directions.
#[must_use]
pub fn has_color_content(image: &RgbaImage, threshold: u8, fraction: f32) -> bool {
    let (width, height) = image.dimensions();
    let side = width.min(height) / 4;
    if side == 0 {
        return false;
    }
    let x0 = (width - side) / 2;
    let y0 = (height - side) / 2;

    let mut sampled = 0u32;
    let mut colored = 0u32;
    for y in (y0..y0 + side).step_by(4) {
        for x in (x0..x0 + side).step_by(4) {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            sampled += 1;
            if r.abs_diff(g) > threshold || g.abs_diff(b) > threshold || r.abs_diff(b) > threshold
            {
                colored += 1;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = colored as f32 / sampled.max(1) as f32;
    ratio > fraction
}

/// Encode as PNG.
///
/// # Errors
///
/// Returns [`ImportError::Encode`] if the encoder fails.
pub fn encode_png(image: &RgbaImage) -> PipelineResult<RasterBlob> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| ImportError::Encode(format!("PNG encoding failed: {e}")))?;
    Ok(RasterBlob {
        data: buf.into_inner(),
        format: ImageFormat::Png,
        width: image.width(),
        height: image.height(),
    })
}

/// Encode as JPEG, compositing translucent pixels onto white.
///
/// # Errors
///
/// Returns [`ImportError::Encode`] if the encoder fails.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> PipelineResult<RasterBlob> {
    let rgb = flatten_onto_white(image);
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8.into())
        .map_err(|e| ImportError::Encode(format!("JPEG encoding failed: {e}")))?;
    Ok(RasterBlob {
        data: buf.into_inner(),
        format: ImageFormat::Jpeg,
        width: image.width(),
        height: image.height(),
    })
}

fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| {
            let v = (u16::from(c) * alpha + 255 * (255 - alpha)) / 255;
            #[allow(clippy::cast_possible_truncation)]
            let v = v as u8;
            v
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Resize an image to fit within `max_dimension` on its longest side while
/// preserving aspect ratio.
///
/// Returns `None` if the image already fits.
#[must_use]
pub fn downscale_to_fit(image: &RgbaImage, max_dimension: u32) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return None;
    }

    // The longest side lands exactly on the limit.
    let shorter = |side: u32, longest: u32| {
        let scaled = (f64::from(side) * f64::from(max_dimension) / f64::from(longest)).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = scaled as u32;
        scaled.max(1)
    };
    let (new_width, new_height) = if width >= height {
        (max_dimension, shorter(height, width))
    } else {
        (shorter(width, height), max_dimension)
    };

    Some(imageops::resize(
        image,
        new_width,
        new_height,
        imageops::FilterType::Triangle,
    ))
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn gray(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255]))
    }

    #[test]
    fn test_gray_page_is_not_colored() {
        assert!(!has_color_content(&gray(200, 300), 5, 0.05));
    }

    #[test]
    fn test_near_gray_within_threshold() {
        let image = RgbaImage::from_pixel(64, 64, Rgba([100, 104, 99, 255]));
        assert!(!has_color_content(&image, 5, 0.05));
    }

    #[test]
    fn test_colored_center_is_detected() {
        let mut image = gray(200, 200);
        for y in 75..125 {
            for x in 75..125 {
                image.put_pixel(x, y, Rgba([220, 30, 30, 255]));
            }
        }
        assert!(has_color_content(&image, 5, 0.05));
    }

    #[test]
    fn test_color_outside_center_is_ignored() {
        let mut image = gray(200, 200);
        for y in 0..40 {
            for x in 0..200 {
                image.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        assert!(!has_color_content(&image, 5, 0.05));
    }

    #[test]
    fn test_tiny_image_is_never_colored() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));
        assert!(!has_color_content(&image, 5, 0.05));
    }

    #[test]
    fn test_png_and_jpeg_magic_bytes() {
        let png = encode_png(&gray(16, 8)).expect("png");
        assert_eq!(ImageFormat::from_magic_bytes(&png.data), Some(ImageFormat::Png));
        assert_eq!((png.width, png.height), (16, 8));

        let jpeg = encode_jpeg(&gray(16, 8), 85).expect("jpeg");
        assert_eq!(ImageFormat::from_magic_bytes(&jpeg.data), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_data_uri_prefix() {
        let png = encode_png(&gray(2, 2)).expect("png");
        assert!(png.to_data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_transparent_pixels_flatten_to_white() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let flat = flatten_onto_white(&image);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_downscale_preserves_aspect() {
        let scaled = downscale_to_fit(&gray(2000, 1000), 512).expect("scaled");
        assert_eq!(scaled.dimensions(), (512, 256));
        assert!(downscale_to_fit(&gray(300, 200), 512).is_none());
    }
}
