//! Source document decoding seam.
//!
//! Page decoding is delegated to an external rasterization library. The
//! traits here are the only surface the pipeline needs from it; the
//! `pdfium` feature provides an implementation backed by PDFium.

use image::RgbaImage;

use crate::error::PipelineResult;

/// Opens source documents.
pub trait DocumentDecoder {
    /// Open a document from its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ImportError::Decode`] if the bytes are not a readable
    /// document.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> PipelineResult<Box<dyn PageSource + 'a>>;

    /// Short backend name for logging.
    fn name(&self) -> &'static str;
}

/// An opened document.
pub trait PageSource {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Get a page by 1-based number.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ImportError::PageRender`] if the page cannot be loaded.
    fn page(&self, number: u32) -> PipelineResult<Box<dyn PageHandle + '_>>;
}

/// One decoded page.
pub trait PageHandle {
    /// Page size in points at scale 1.0.
    fn size(&self) -> (f32, f32);

    /// Render the page at `scale` into `target`, which is already sized to
    /// the scaled page and cleared to white.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ImportError::PageRender`] if rendering fails.
    fn render_to(&self, target: &mut RgbaImage, scale: f32) -> PipelineResult<()>;
}
