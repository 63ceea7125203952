//! PDFium-backed document decoder.
//!
//! The PDFium shared library is located at runtime: an explicit path first,
//! then `lib/` next to the working directory and the executable, and finally
//! the system library search path.

use std::path::{Path, PathBuf};

use image::{imageops, RgbaImage};
use pdfium_render::prelude::*;

use crate::decoder::{DocumentDecoder, PageHandle, PageSource};
use crate::error::{ImportError, PipelineResult};

/// Decoder that renders pages with PDFium.
pub struct PdfiumDecoder {
    pdfium: Pdfium,
}

impl std::fmt::Debug for PdfiumDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumDecoder").finish_non_exhaustive()
    }
}

impl PdfiumDecoder {
    /// Bind to the PDFium library.
    ///
    /// `library` is tried first when given.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Decode`] if no PDFium library can be loaded.
    pub fn load(library: Option<&Path>) -> PipelineResult<Self> {
        let candidates = library
            .map(Path::to_path_buf)
            .into_iter()
            .chain(Self::search_paths());
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Pdfium::bind_to_library(&path) {
                Ok(bindings) => {
                    tracing::debug!(path = %path.display(), "Bound PDFium library");
                    return Ok(Self {
                        pdfium: Pdfium::new(bindings),
                    });
                }
                Err(e) => tracing::warn!(path = %path.display(), "Failed to bind PDFium: {e:?}"),
            }
        }
        Pdfium::bind_to_system_library()
            .map(|bindings| Self {
                pdfium: Pdfium::new(bindings),
            })
            .map_err(|e| ImportError::Decode(format!("Failed to load pdfium: {e:?}")))
    }

    fn search_paths() -> Vec<PathBuf> {
        let library = Pdfium::pdfium_platform_library_name();
        let mut paths = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join("lib").join(&library));
        }

        if let Ok(exe) = std::env::current_exe() {
            if let Some(parent) = exe.parent() {
                paths.push(parent.join("lib").join(&library));
            }
        }

        paths
    }
}

impl DocumentDecoder for PdfiumDecoder {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> PipelineResult<Box<dyn PageSource + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ImportError::Decode(format!("{e:?}")))?;
        Ok(Box::new(PdfiumDocument { document }))
    }

    fn name(&self) -> &'static str {
        "pdfium"
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> u32 {
        u32::from(self.document.pages().len())
    }

    fn page(&self, number: u32) -> PipelineResult<Box<dyn PageHandle + '_>> {
        let index = number
            .checked_sub(1)
            .and_then(|i| PdfPageIndex::try_from(i).ok())
            .ok_or_else(|| ImportError::page(number, "page number out of range"))?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| ImportError::page(number, format!("{e:?}")))?;
        Ok(Box::new(PdfiumPage { page, number }))
    }
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    number: u32,
}

impl PageHandle for PdfiumPage<'_> {
    fn size(&self) -> (f32, f32) {
        (self.page.width().value, self.page.height().value)
    }

    fn render_to(&self, target: &mut RgbaImage, _scale: f32) -> PipelineResult<()> {
        let (width, height) = target.dimensions();
        let to_i32 = |v: u32| {
            i32::try_from(v).map_err(|_| ImportError::page(self.number, "page too large"))
        };
        let config = PdfRenderConfig::new()
            .set_target_width(to_i32(width)?)
            .set_target_height(to_i32(height)?)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = self
            .page
            .render_with_config(&config)
            .map_err(|e| ImportError::page(self.number, format!("{e:?}")))?;

        let rendered = bitmap.as_image().to_rgba8();
        imageops::overlay(target, &rendered, 0, 0);
        Ok(())
    }
}
