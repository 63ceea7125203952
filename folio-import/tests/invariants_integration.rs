//! Integration tests for materialization and the standing invariants.
//!
//! Exercises lock correction, bottom-most paint order, camera containment
//! and teardown against a live editor.

mod common;

use std::sync::Arc;

use folio_core::{
    Editor, Element, ElementKind, ElementUpdate, OrderIndex, QualityTier, Transform,
};
use folio_import::{
    enforce_z_order, CameraPolicy, DocumentMaterializer, EngineState, ImportError, ImportResult,
    ImportedObjectSet, InvariantEngine,
};

use common::{editor, pipeline, source, PageSpec, SyntheticDecoder};

async fn render(count: usize) -> ImportResult {
    let specs = vec![PageSpec::text(600.0, 800.0); count];
    pipeline(SyntheticDecoder::new(specs))
        .import(&source("doc.pdf"), 0.5)
        .await
        .expect("import")
}

async fn materialized(editor: &Editor, count: usize) -> Arc<ImportedObjectSet> {
    let result = render(count).await;
    Arc::new(DocumentMaterializer::materialize(editor, &result).expect("materialize"))
}

fn note(editor: &Editor) -> Element {
    let container = editor.current_container();
    Element::new(
        ElementKind::Geo {
            geo: "rectangle".to_string(),
            color: "#1d1d1d".to_string(),
        },
        container,
    )
    .with_index(editor.next_top_index(container))
    .with_transform(Transform {
        x: 10.0,
        y: 10.0,
        width: 50.0,
        height: 50.0,
        rotation: 0.0,
    })
}

fn paint_order(editor: &Editor) -> Vec<folio_core::ElementId> {
    editor
        .elements_in_paint_order(editor.current_container())
        .into_iter()
        .map(|e| e.id)
        .collect()
}

fn lowest_index(editor: &Editor) -> OrderIndex {
    editor.elements_in_paint_order(editor.current_container())[0]
        .index
        .clone()
}

#[tokio::test]
async fn test_materialized_pages_are_locked_and_ordered() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 3).await;

    assert_eq!(paint_order(&editor), set.ids());
    for (i, id) in set.ids().iter().enumerate() {
        let element = editor.element(*id).expect("element");
        assert!(element.locked);
        assert_eq!(element.parent, editor.current_container());
        match element.kind {
            ElementKind::PdfPage {
                asset_id,
                page_number,
                pdf_id,
                quality,
            } => {
                assert_eq!(page_number as usize, i + 1);
                assert_eq!(pdf_id, set.pdf_id());
                assert_eq!(quality, QualityTier::Medium);
                let asset = editor.asset(asset_id).expect("asset");
                assert_eq!(asset.name, format!("doc.pdf p.{}", i + 1));
                assert_eq!(asset.source.mime_type, "image/png");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
    assert_eq!(editor.stats().create_batches, 1);
}

#[tokio::test]
async fn test_pages_land_above_existing_content() {
    let editor = editor(1280.0, 800.0);
    let existing = note(&editor);
    editor.create_elements(vec![existing.clone()]).expect("create");

    let set = materialized(&editor, 2).await;
    let order = paint_order(&editor);
    assert_eq!(order[0], existing.id);
    assert_eq!(&order[1..], set.ids());
}

#[tokio::test]
async fn test_rejected_elements_roll_back_assets() {
    let editor = editor(1280.0, 800.0);
    let result = render(2).await;

    let clash = note(&editor).with_id(result.pages[1].element_id);
    editor.create_elements(vec![clash]).expect("create");

    let err = DocumentMaterializer::materialize(&editor, &result).expect_err("rejected");
    assert!(matches!(err, ImportError::Materialization(_)));
    for page in &result.pages {
        assert!(editor.asset(page.asset_id).is_none());
    }
    assert!(editor.element(result.pages[0].element_id).is_none());
}

#[tokio::test]
async fn test_registration_into_empty_container_issues_no_updates() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 3).await;

    assert!(!enforce_z_order(&editor, &set).expect("enforce"));
    let engine = InvariantEngine::register(&editor, set, &CameraPolicy::default())
        .expect("register");
    assert_eq!(engine.state(), EngineState::Enforcing);
    assert_eq!(editor.stats().update_batches, 0);
}

#[tokio::test]
async fn test_unlock_is_rewritten_to_locked() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 2).await;
    let _engine = InvariantEngine::register(&editor, Arc::clone(&set), &CameraPolicy::default())
        .expect("register");

    let page = set.ids()[0];
    let before = editor.element(page).expect("page");
    let unlock = ElementUpdate::new(page).locked(false);

    editor.update_elements(vec![unlock.clone()]).expect("update");
    let once = editor.element(page).expect("page");
    assert!(once.locked);
    assert_eq!(once, before);

    editor.update_elements(vec![unlock]).expect("update");
    assert_eq!(editor.element(page).expect("page"), once);
}

#[tokio::test]
async fn test_unrelated_elements_may_unlock() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 1).await;
    let _engine = InvariantEngine::register(&editor, set, &CameraPolicy::default())
        .expect("register");

    let other = note(&editor).with_locked(true);
    let id = other.id;
    editor.create_elements(vec![other]).expect("create");
    editor
        .update_elements(vec![ElementUpdate::new(id).locked(false)])
        .expect("update");
    assert!(!editor.element(id).expect("note").locked);
}

#[tokio::test]
async fn test_z_order_enforcement_is_idempotent() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 2).await;

    let other = note(&editor).with_index(lowest_index(&editor).below());
    editor.create_elements(vec![other]).expect("create");

    assert!(enforce_z_order(&editor, &set).expect("first"));
    let after_first = editor.stats().update_batches;
    assert!(!enforce_z_order(&editor, &set).expect("second"));
    assert_eq!(editor.stats().update_batches, after_first);
}

#[tokio::test]
async fn test_dragging_content_below_pages_is_undone_in_one_batch() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 2).await;
    let _engine = InvariantEngine::register(&editor, Arc::clone(&set), &CameraPolicy::default())
        .expect("register");

    let other = note(&editor);
    let other_id = other.id;
    editor.create_elements(vec![other]).expect("create");
    assert_eq!(editor.stats().update_batches, 0);

    let below = lowest_index(&editor).below();
    editor
        .update_elements(vec![ElementUpdate::new(other_id).index(below)])
        .expect("drag");

    // The drag itself plus exactly one corrective batch.
    assert_eq!(editor.stats().update_batches, 2);
    let order = paint_order(&editor);
    assert_eq!(&order[..2], set.ids());
    assert_eq!(order[2], other_id);
}

#[tokio::test]
async fn test_new_content_below_pages_is_moved_under() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 2).await;
    let _engine = InvariantEngine::register(&editor, Arc::clone(&set), &CameraPolicy::default())
        .expect("register");

    let sneaky = note(&editor).with_index(lowest_index(&editor).below());
    editor.create_elements(vec![sneaky]).expect("create");

    assert_eq!(&paint_order(&editor)[..2], set.ids());
}

#[tokio::test]
async fn test_camera_is_contained_to_pages() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 2).await;
    let engine = InvariantEngine::register(&editor, set, &CameraPolicy::default())
        .expect("register");

    // Two 300 x 400 pages with a 32 unit gap.
    let bounds = engine.camera_bounds().expect("bounds");
    assert!((bounds.width - 300.0).abs() < 1e-3);
    assert!((bounds.height - 832.0).abs() < 1e-3);

    let constraint = editor.camera_constraints().expect("constraint");
    assert_eq!(constraint.padding, (164.0, 64.0));

    let camera = editor.camera();
    assert!((camera.zoom - 1.0).abs() < f32::EPSILON);
    assert!((camera.pan_x - 490.0).abs() < 1e-3);
    assert!((camera.pan_y - 64.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_narrow_viewport_uses_small_padding() {
    let editor = editor(390.0, 800.0);
    let set = materialized(&editor, 1).await;
    let _engine = InvariantEngine::register(&editor, set, &CameraPolicy::default())
        .expect("register");

    let constraint = editor.camera_constraints().expect("constraint");
    assert_eq!(constraint.padding, (16.0, 64.0));
    // 358 px available for a 300 unit page: fits at 100%.
    assert!((editor.zoom() - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_teardown_stops_enforcement() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 1).await;
    let mut engine = InvariantEngine::register(&editor, Arc::clone(&set), &CameraPolicy::default())
        .expect("register");
    assert_eq!(editor.handler_count(), 3);

    engine.teardown();
    engine.teardown();
    assert_eq!(engine.state(), EngineState::Unregistered);
    assert_eq!(editor.handler_count(), 0);

    let page = set.ids()[0];
    editor
        .update_elements(vec![ElementUpdate::new(page).locked(false)])
        .expect("update");
    assert!(!editor.element(page).expect("page").locked);
}

#[tokio::test]
async fn test_dropping_engine_unregisters() {
    let editor = editor(1280.0, 800.0);
    let set = materialized(&editor, 1).await;
    {
        let _engine = InvariantEngine::register(&editor, set, &CameraPolicy::default())
            .expect("register");
        assert_eq!(editor.handler_count(), 3);
    }
    assert_eq!(editor.handler_count(), 0);
}
