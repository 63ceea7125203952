//! Shared fixtures for folio-import integration tests.
//!
//! Provides a synthetic decoder that renders flat pages without any PDF
//! library, plus helpers to build pipelines and editors.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use folio_core::{Editor, Scene};
use folio_import::{
    DevicePolicy, DocumentDecoder, EncodingPolicy, ImportError, ImportPipeline, PageHandle,
    PageRasterizer, PageSource, PipelineResult, SourceDocument,
};
use image::{Rgba, RgbaImage};

/// US Letter in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// What a synthetic page looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// Black text lines on white.
    Text,
    /// Solid saturated color.
    Color,
}

/// One synthetic page.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec {
    pub size: (f32, f32),
    pub fill: Fill,
    pub fail: bool,
}

impl PageSpec {
    pub fn text(width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            fill: Fill::Text,
            fail: false,
        }
    }

    pub fn color(width: f32, height: f32) -> Self {
        Self {
            size: (width, height),
            fill: Fill::Color,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

/// Decoder serving fixed synthetic pages for any byte buffer starting with
/// the `%PDF` header.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDecoder {
    pages: Vec<PageSpec>,
    renders: Arc<AtomicUsize>,
}

impl SyntheticDecoder {
    pub fn new(pages: Vec<PageSpec>) -> Self {
        Self {
            pages,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `count` letter-sized text pages.
    pub fn letters(count: usize) -> Self {
        Self::new(vec![PageSpec::text(LETTER.0, LETTER.1); count])
    }

    /// Counter of render calls, shared with clones.
    pub fn render_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.renders)
    }
}

impl DocumentDecoder for SyntheticDecoder {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> PipelineResult<Box<dyn PageSource + 'a>> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ImportError::Decode("missing %PDF header".to_string()));
        }
        Ok(Box::new(SyntheticDocument { decoder: self }))
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

struct SyntheticDocument<'a> {
    decoder: &'a SyntheticDecoder,
}

impl PageSource for SyntheticDocument<'_> {
    fn page_count(&self) -> u32 {
        u32::try_from(self.decoder.pages.len()).expect("page count fits u32")
    }

    fn page(&self, number: u32) -> PipelineResult<Box<dyn PageHandle + '_>> {
        let spec = number
            .checked_sub(1)
            .and_then(|i| self.decoder.pages.get(i as usize))
            .ok_or_else(|| ImportError::page(number, "no such page"))?;
        Ok(Box::new(SyntheticPage {
            number,
            spec: *spec,
            renders: Arc::clone(&self.decoder.renders),
        }))
    }
}

struct SyntheticPage {
    number: u32,
    spec: PageSpec,
    renders: Arc<AtomicUsize>,
}

impl PageHandle for SyntheticPage {
    fn size(&self) -> (f32, f32) {
        self.spec.size
    }

    fn render_to(&self, target: &mut RgbaImage, _scale: f32) -> PipelineResult<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.spec.fail {
            return Err(ImportError::page(self.number, "synthetic render failure"));
        }
        match self.spec.fill {
            Fill::Text => {
                for (_, y, pixel) in target.enumerate_pixels_mut() {
                    if y % 12 < 2 {
                        *pixel = Rgba([0, 0, 0, 255]);
                    }
                }
            }
            Fill::Color => {
                for pixel in target.pixels_mut() {
                    *pixel = Rgba([200, 40, 60, 255]);
                }
            }
        }
        Ok(())
    }
}

/// Bytes the synthetic decoder accepts.
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n% synthetic".to_vec()
}

/// A source document the synthetic decoder accepts.
pub fn source(name: &str) -> SourceDocument {
    SourceDocument::new(name, pdf_bytes())
}

/// Pipeline over `decoder` on a 1x, unconstrained device.
pub fn pipeline(decoder: SyntheticDecoder) -> ImportPipeline {
    ImportPipeline::new(
        Box::new(decoder),
        PageRasterizer::new(DevicePolicy::default(), EncodingPolicy::default()),
    )
}

/// Editor over an empty scene with the given viewport.
pub fn editor(width: f32, height: f32) -> Editor {
    Editor::new(Scene::new(width, height))
}
