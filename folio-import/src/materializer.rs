//! Creation of assets and locked page elements in the live document.

use std::collections::HashSet;

use folio_core::{
    Asset, AssetId, AssetSource, ContainerId, Editor, Element, ElementId, ElementKind,
    OrderIndex, QualityTier, Transform,
};
use uuid::Uuid;

use crate::bitmap::RasterBlob;
use crate::error::{ImportError, PipelineResult};
use crate::pipeline::{ImportResult, PageRecord};

/// The elements created from one import, tracked as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedObjectSet {
    pdf_id: Uuid,
    container: ContainerId,
    ids: Vec<ElementId>,
    members: HashSet<ElementId>,
}

impl ImportedObjectSet {
    /// Build a set from element IDs in page order.
    #[must_use]
    pub fn new(pdf_id: Uuid, container: ContainerId, ids: Vec<ElementId>) -> Self {
        let members = ids.iter().copied().collect();
        Self {
            pdf_id,
            container,
            ids,
            members,
        }
    }

    /// Identifier shared by every page element of the import.
    #[must_use]
    pub fn pdf_id(&self) -> Uuid {
        self.pdf_id
    }

    /// Container the elements were created in.
    #[must_use]
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Element IDs in page order.
    #[must_use]
    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    /// Whether `id` belongs to this import.
    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.members.contains(&id)
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Turns page records into live assets and elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentMaterializer;

impl DocumentMaterializer {
    /// Create one asset and one locked page element per record, in a single
    /// all-or-nothing batch.
    ///
    /// The elements go into the editor's current container, above its
    /// existing children, ordered like the records.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Materialization`] if either batch is rejected.
    /// Assets created before a rejected element batch are removed again.
    pub fn materialize(
        editor: &Editor,
        result: &ImportResult,
    ) -> PipelineResult<ImportedObjectSet> {
        let pdf_id = Uuid::new_v4();
        let container = editor.current_container();
        let top = editor
            .elements_in_paint_order(container)
            .last()
            .map(|e| e.index.clone());
        let indices = OrderIndex::n_between(top.as_ref(), None, result.pages.len())
            .map_err(ImportError::Materialization)?;

        let assets: Vec<Asset> = result
            .pages
            .iter()
            .map(|record| page_asset(&result.name, record))
            .collect();
        let elements: Vec<Element> = result
            .pages
            .iter()
            .zip(indices)
            .map(|(record, index)| page_element(record, pdf_id, container, index))
            .collect();
        let ids: Vec<ElementId> = elements.iter().map(|e| e.id).collect();
        let asset_ids: Vec<AssetId> = assets.iter().map(|a| a.id).collect();

        editor
            .create_assets(assets)
            .map_err(ImportError::Materialization)?;

        if let Err(e) = editor.create_elements(elements) {
            tracing::warn!(error = %e, "Page elements rejected; removing created assets");
            if let Err(cleanup) = editor.delete_assets(&asset_ids) {
                tracing::warn!(error = %cleanup, "Failed to remove orphaned assets");
            }
            return Err(ImportError::Materialization(e));
        }

        tracing::info!(
            name = %result.name,
            pages = ids.len(),
            %container,
            "Pages materialized"
        );
        Ok(ImportedObjectSet::new(pdf_id, container, ids))
    }

    /// Remove the page elements and assets created for `result`. Records
    /// that were never placed are skipped.
    pub fn discard(editor: &Editor, result: &ImportResult) {
        let elements: Vec<ElementId> = result.pages.iter().map(|r| r.element_id).collect();
        let assets: Vec<AssetId> = result.pages.iter().map(|r| r.asset_id).collect();
        if let Err(e) = editor
            .delete_elements(&elements)
            .and_then(|()| editor.delete_assets(&assets))
        {
            tracing::warn!(error = %e, "Failed to remove imported pages");
            return;
        }
        tracing::debug!(name = %result.name, pages = elements.len(), "Imported pages discarded");
    }
}

fn source_of(blob: &RasterBlob) -> AssetSource {
    AssetSource {
        src: blob.to_data_uri(),
        mime_type: blob.format.mime_type().to_string(),
        width: blob.width,
        height: blob.height,
    }
}

fn page_asset(document: &str, record: &PageRecord) -> Asset {
    let asset = Asset::new(
        record.asset_id,
        format!("{document} p.{}", record.page_number),
        source_of(&record.image),
    );
    match &record.preview {
        Some(preview) => asset.with_rendition(QualityTier::Low, source_of(preview)),
        None => asset,
    }
}

fn page_element(
    record: &PageRecord,
    pdf_id: Uuid,
    container: ContainerId,
    index: OrderIndex,
) -> Element {
    Element::new(
        ElementKind::PdfPage {
            asset_id: record.asset_id,
            page_number: record.page_number,
            pdf_id,
            quality: QualityTier::Medium,
        },
        container,
    )
    .with_id(record.element_id)
    .with_transform(Transform::from(record.bounds))
    .with_index(index)
    .with_locked(true)
}
