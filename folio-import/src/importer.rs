//! End-to-end import into a live editor.
//!
//! [`PdfImporter`] runs the whole flow: render every page, wait for the live
//! editor, materialize the pages, then attach the standing invariants and
//! the quality tier observer. The returned [`ImportSession`] owns those
//! standing behaviors for as long as the document stays open.

use std::sync::Arc;

use folio_core::Editor;

use crate::config::ImportConfig;
use crate::decoder::DocumentDecoder;
use crate::error::{ImportError, PipelineResult};
use crate::invariants::InvariantEngine;
use crate::materializer::{DocumentMaterializer, ImportedObjectSet};
use crate::pipeline::{ImportPipeline, ImportResult, SourceDocument};
use crate::quality::QualityTierManager;
use crate::rasterizer::PageRasterizer;
use crate::readiness::{EditorSlot, ReadinessGate};

/// Imports paginated documents into the editor mounted in a slot.
#[derive(Debug)]
pub struct PdfImporter {
    pipeline: ImportPipeline,
    gate: ReadinessGate,
    config: ImportConfig,
}

impl PdfImporter {
    /// Create an importer.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidConfig`] if `config` is out of range.
    pub fn new(
        decoder: Box<dyn DocumentDecoder>,
        slot: EditorSlot,
        config: ImportConfig,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let rasterizer = PageRasterizer::new(config.device, config.encoding);
        let pipeline = ImportPipeline::new(decoder, rasterizer)
            .with_page_gap(config.page_gap)
            .with_reclaim_every(config.reclaim_every);
        Ok(Self {
            pipeline,
            gate: ReadinessGate::new(slot),
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import `source` at the configured resolution.
    ///
    /// # Errors
    ///
    /// See [`PdfImporter::import_at`].
    pub async fn import(&mut self, source: &SourceDocument) -> PipelineResult<ImportSession> {
        let resolution = self.config.resolution;
        self.import_at(source, resolution).await
    }

    /// Import `source` at `resolution`.
    ///
    /// On failure nothing from this import is left in the live document:
    /// pages placed before a later step fails are removed again.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's decode and render errors,
    /// [`ImportError::ReadinessTimeout`] if no editor is mounted in time,
    /// [`ImportError::Cancelled`] if the editor was torn down meanwhile, and
    /// [`ImportError::Materialization`] if the batch creation is rejected.
    pub async fn import_at(
        &mut self,
        source: &SourceDocument,
        resolution: f32,
    ) -> PipelineResult<ImportSession> {
        let result = self.pipeline.import(source, resolution).await?;

        let Some(editor) = self.gate.await_editor(&self.config.readiness).await else {
            tracing::warn!(
                attempts = self.config.readiness.max_attempts,
                "Editor not ready; abandoning import"
            );
            return Err(ImportError::ReadinessTimeout {
                attempts: self.config.readiness.max_attempts,
            });
        };

        let objects = match DocumentMaterializer::materialize(&editor, &result) {
            Ok(objects) => Arc::new(objects),
            Err(_) if editor.is_disposed() => return Err(ImportError::Cancelled),
            Err(e) => return Err(e),
        };
        let (invariants, quality) = match self.attach(&editor, &objects) {
            Ok(attached) => attached,
            Err(e) => {
                let e = if editor.is_disposed() {
                    ImportError::Cancelled
                } else {
                    e
                };
                tracing::warn!(error = %e, "Import abandoned; removing placed pages");
                DocumentMaterializer::discard(&editor, &result);
                return Err(e);
            }
        };

        tracing::info!(
            name = %result.name,
            pages = objects.len(),
            failed = result.failed_pages.len(),
            "Import complete"
        );

        Ok(ImportSession {
            editor,
            objects,
            invariants: Some(invariants),
            quality: Some(quality),
            result: Some(result),
        })
    }

    /// Start the standing behaviors for freshly placed pages. Fails with
    /// [`ImportError::Cancelled`] if the editor is torn down while they
    /// are being attached.
    fn attach(
        &self,
        editor: &Editor,
        objects: &Arc<ImportedObjectSet>,
    ) -> PipelineResult<(InvariantEngine, QualityTierManager)> {
        if editor.is_disposed() {
            return Err(ImportError::Cancelled);
        }
        let invariants =
            InvariantEngine::register(editor, Arc::clone(objects), &self.config.camera)?;

        let mut quality = QualityTierManager::new(editor, self.config.quality);
        if let Err(e) = quality.observe() {
            tracing::warn!(error = %e, "Initial quality tiers not applied");
        }
        if editor.is_disposed() {
            return Err(ImportError::Cancelled);
        }
        quality.start();
        Ok((invariants, quality))
    }
}

/// Standing state of one imported document.
#[derive(Debug)]
pub struct ImportSession {
    editor: Editor,
    objects: Arc<ImportedObjectSet>,
    invariants: Option<InvariantEngine>,
    quality: Option<QualityTierManager>,
    result: Option<ImportResult>,
}

impl ImportSession {
    /// The live editor the pages were imported into.
    #[must_use]
    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// The imported elements.
    #[must_use]
    pub fn objects(&self) -> &ImportedObjectSet {
        &self.objects
    }

    /// The rendered page records, until the session is closed.
    #[must_use]
    pub fn result(&self) -> Option<&ImportResult> {
        self.result.as_ref()
    }

    /// The invariant engine, until the session is closed.
    #[must_use]
    pub fn invariants(&self) -> Option<&InvariantEngine> {
        self.invariants.as_ref()
    }

    /// The quality tier manager, until the session is closed.
    #[must_use]
    pub fn quality(&self) -> Option<&QualityTierManager> {
        self.quality.as_ref()
    }

    /// Whether [`ImportSession::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.invariants.is_none()
    }

    /// Detach the invariants and the tier observer and drop the page
    /// records. The materialized elements stay in the document. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut invariants) = self.invariants.take() {
            invariants.teardown();
        }
        if let Some(mut quality) = self.quality.take() {
            quality.stop();
        }
        if self.result.take().is_some() {
            tracing::debug!(pages = self.objects.len(), "Import session closed");
        }
    }
}

impl Drop for ImportSession {
    fn drop(&mut self) {
        self.close();
    }
}
