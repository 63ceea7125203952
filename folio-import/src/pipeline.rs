//! Sequential import of every page of a source document.
//!
//! Pages are rendered one at a time into a single [`DrawingSurface`] and
//! stacked top to bottom with a fixed gap. A page that fails to render is
//! logged and skipped; the next successful page takes its place, so the
//! column never has holes. Once every page has been attempted the column
//! is centered on its widest page.

use std::sync::Arc;

use folio_core::{AssetId, ElementId, Rect};

use crate::bitmap::RasterBlob;
use crate::decoder::DocumentDecoder;
use crate::error::{ImportError, PipelineResult};
use crate::rasterizer::PageRasterizer;
use crate::surface::DrawingSurface;

/// Vertical gap between stacked pages, in canvas units.
pub const DEFAULT_PAGE_GAP: f32 = 32.0;

/// Pages between two advisory surface reclamations.
pub const DEFAULT_RECLAIM_EVERY: u32 = 5;

/// A document supplied for import.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Display name, used to name the created assets.
    pub name: String,
    /// Raw document bytes.
    pub bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Create a source document.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// One rendered page, placed in the column and keyed for materialization.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// 1-based page number in the source document.
    pub page_number: u32,
    /// Full render.
    pub image: RasterBlob,
    /// Down-scaled preview, if one was produced.
    pub preview: Option<RasterBlob>,
    /// Placement rectangle in canvas units.
    pub bounds: Rect,
    /// Identifier of the asset this page becomes.
    pub asset_id: AssetId,
    /// Identifier of the placed element this page becomes.
    pub element_id: ElementId,
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct ImportResult {
    /// Document name.
    pub name: String,
    /// Rendered pages, top to bottom. Also the required paint order.
    pub pages: Vec<PageRecord>,
    /// Page numbers that failed to render.
    pub failed_pages: Vec<u32>,
    /// The document that was imported.
    pub source: SourceDocument,
}

impl ImportResult {
    /// Combined bounds of every page.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::union_all(self.pages.iter().map(|p| &p.bounds))
    }
}

/// Running top-to-bottom placement of page rectangles.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    gap: f32,
    top: f32,
}

impl PageLayout {
    /// Start an empty column.
    #[must_use]
    pub fn new(gap: f32) -> Self {
        Self { gap, top: 0.0 }
    }

    /// Place the next page below the previous one.
    pub fn place(&mut self, width: f32, height: f32) -> Rect {
        let rect = Rect::new(0.0, self.top, width, height);
        self.top += height + self.gap;
        rect
    }

    /// Center every rectangle horizontally on the widest one.
    pub fn center<'a>(rects: impl IntoIterator<Item = &'a mut Rect>) {
        let mut rects: Vec<&mut Rect> = rects.into_iter().collect();
        let widest = rects.iter().map(|r| r.width).fold(0.0_f32, f32::max);
        for rect in &mut rects {
            rect.x = (widest - rect.width) / 2.0;
        }
    }
}

/// Renders source documents into page records.
pub struct ImportPipeline {
    decoder: Box<dyn DocumentDecoder>,
    rasterizer: PageRasterizer,
    surface: DrawingSurface,
    page_gap: f32,
    reclaim_every: u32,
}

impl std::fmt::Debug for ImportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportPipeline")
            .field("decoder", &self.decoder.name())
            .field("rasterizer", &self.rasterizer)
            .field("surface", &self.surface)
            .field("page_gap", &self.page_gap)
            .field("reclaim_every", &self.reclaim_every)
            .finish()
    }
}

impl ImportPipeline {
    /// Create a pipeline with its own drawing surface.
    #[must_use]
    pub fn new(decoder: Box<dyn DocumentDecoder>, rasterizer: PageRasterizer) -> Self {
        Self {
            decoder,
            rasterizer,
            surface: DrawingSurface::new(),
            page_gap: DEFAULT_PAGE_GAP,
            reclaim_every: DEFAULT_RECLAIM_EVERY,
        }
    }

    /// Set the gap between pages.
    #[must_use]
    pub fn with_page_gap(mut self, gap: f32) -> Self {
        self.page_gap = gap;
        self
    }

    /// Set how many pages pass between advisory reclamations (0 disables).
    #[must_use]
    pub fn with_reclaim_every(mut self, pages: u32) -> Self {
        self.reclaim_every = pages;
        self
    }

    /// The drawing surface owned by this pipeline.
    #[must_use]
    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    /// Render every page of `source` at `resolution`.
    ///
    /// Taking `&mut self` serializes all renders on this pipeline's surface.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidScale`] for a non-positive resolution,
    /// [`ImportError::Decode`] if the document cannot be opened, and
    /// [`ImportError::NoPagesRendered`] if every page failed.
    pub async fn import(
        &mut self,
        source: &SourceDocument,
        resolution: f32,
    ) -> PipelineResult<ImportResult> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(ImportError::InvalidScale(resolution));
        }

        let document = self.decoder.open(&source.bytes)?;
        let total = document.page_count();
        tracing::info!(
            name = %source.name,
            pages = total,
            decoder = self.decoder.name(),
            resolution,
            "Importing document"
        );

        let mut layout = PageLayout::new(self.page_gap);
        let mut pages = Vec::new();
        let mut failed_pages = Vec::new();

        for number in 1..=total {
            let rendered = document.page(number).and_then(|page| {
                self.rasterizer
                    .rasterize(page.as_ref(), resolution, &mut self.surface)
            });

            match rendered {
                Ok(page) => {
                    let bounds = layout.place(page.width, page.height);
                    tracing::debug!(
                        page = number,
                        width = page.image.width,
                        height = page.image.height,
                        format = ?page.image.format,
                        "Rendered page"
                    );
                    pages.push(PageRecord {
                        page_number: number,
                        image: page.image,
                        preview: page.preview,
                        bounds,
                        asset_id: AssetId::new(),
                        element_id: ElementId::new(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        page = number,
                        error = %e,
                        "Skipping page that failed to render"
                    );
                    failed_pages.push(number);
                }
            }

            if self.reclaim_every > 0 && number % self.reclaim_every == 0 {
                self.surface.reclaim();
            }
            tokio::task::yield_now().await;
        }

        self.surface.reclaim();

        if pages.is_empty() {
            return Err(ImportError::NoPagesRendered {
                failed: u32::try_from(failed_pages.len()).unwrap_or(u32::MAX),
                total,
            });
        }

        PageLayout::center(pages.iter_mut().map(|p| &mut p.bounds));

        tracing::info!(
            name = %source.name,
            rendered = pages.len(),
            failed = failed_pages.len(),
            "Document rendered"
        );

        Ok(ImportResult {
            name: source.name.clone(),
            pages,
            failed_pages,
            source: source.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stacks_with_gap() {
        let mut layout = PageLayout::new(32.0);
        let a = layout.place(600.0, 800.0);
        let b = layout.place(400.0, 300.0);
        let c = layout.place(500.0, 100.0);
        assert!((a.y - 0.0).abs() < f32::EPSILON);
        assert!((b.y - 832.0).abs() < f32::EPSILON);
        assert!((c.y - 1164.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_center_on_widest() {
        let mut rects = vec![
            Rect::new(0.0, 0.0, 600.0, 10.0),
            Rect::new(0.0, 42.0, 400.0, 10.0),
        ];
        PageLayout::center(rects.iter_mut());
        assert!((rects[0].x - 0.0).abs() < f32::EPSILON);
        assert!((rects[1].x - 100.0).abs() < f32::EPSILON);
        assert!((rects[1].y - 42.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_source_document_from_vec() {
        let source = SourceDocument::new("report.pdf", b"%PDF-1.7".to_vec());
        assert_eq!(source.bytes.len(), 8);
        assert_eq!(source.name, "report.pdf");
    }
}
