//! Integration tests for the shared [`Editor`] handle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use folio_core::{
    Asset, AssetId, AssetSource, CanvasError, Editor, Element, ElementKind, ElementUpdate, Scene,
};

fn image_asset() -> Asset {
    Asset::new(
        AssetId::new(),
        "scan",
        AssetSource {
            src: "data:image/png;base64,".to_string(),
            mime_type: "image/png".to_string(),
            width: 10,
            height: 10,
        },
    )
}

fn text(editor: &Editor, content: &str) -> Element {
    let container = editor.current_container();
    Element::new(
        ElementKind::Text {
            content: content.to_string(),
            font_size: 14.0,
            color: "#000000".to_string(),
        },
        container,
    )
    .with_index(editor.next_top_index(container))
}

#[test]
fn test_clones_share_one_document() {
    let editor = Editor::new(Scene::new(800.0, 600.0));
    let other = editor.clone();

    let element = text(&editor, "hello");
    let id = element.id;
    other.create_elements(vec![element]).expect("create");

    assert!(editor.element(id).is_some());
    assert!(editor.same_as(&other));
    assert_eq!(editor.stats().create_batches, 1);
}

#[test]
fn test_concurrent_batches_are_all_applied() {
    let editor = Editor::new(Scene::new(800.0, 600.0));
    let created = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&created);
    let _hook = editor.register_after_create(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let editor = editor.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let element = text(&editor, &format!("{w}-{i}"));
                    editor.create_elements(vec![element]).expect("create");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    assert_eq!(editor.scene().element_count(), 40);
    assert_eq!(created.load(Ordering::SeqCst), 40);
    assert_eq!(editor.stats().create_batches, 40);
}

#[test]
fn test_image_requires_its_asset() {
    let editor = Editor::new(Scene::new(800.0, 600.0));
    let asset = image_asset();
    let orphan = Element::new(
        ElementKind::Image {
            asset_id: asset.id,
        },
        editor.current_container(),
    );
    assert!(matches!(
        editor.create_elements(vec![orphan.clone()]),
        Err(CanvasError::AssetNotFound(_))
    ));

    editor.create_assets(vec![asset]).expect("asset");
    editor.create_elements(vec![orphan]).expect("element");
}

#[test]
fn test_scene_snapshot_survives_json() {
    let editor = Editor::new(Scene::new(800.0, 600.0));
    editor.create_assets(vec![image_asset()]).expect("asset");
    let element = text(&editor, "persist me");
    let id = element.id;
    editor.create_elements(vec![element]).expect("create");
    editor
        .update_elements(vec![ElementUpdate::new(id).position(40.0, 60.0)])
        .expect("move");

    let json = editor.scene().to_json().expect("serialize");
    let restored = Editor::new(Scene::from_json(&json).expect("deserialize"));

    let element = restored.element(id).expect("element");
    assert!((element.transform.x - 40.0).abs() < f32::EPSILON);
    assert!((element.transform.y - 60.0).abs() < f32::EPSILON);
    assert_eq!(restored.scene().asset_count(), 1);
}

#[test]
fn test_concurrent_updates_to_one_element_both_land() {
    let editor = Editor::new(Scene::new(800.0, 600.0));
    let element = text(&editor, "contended");
    let id = element.id;
    editor.create_elements(vec![element]).expect("create");

    // The first interception stalls long enough for a second writer to
    // commit its own change to the same element.
    let stalled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stalled);
    let _slow = editor.register_before_change(move |_, next| {
        if !flag.swap(true, Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(200));
        }
        next
    });

    let locker = {
        let editor = editor.clone();
        thread::spawn(move || {
            editor
                .update_elements(vec![ElementUpdate::new(id).locked(true)])
                .expect("lock");
        })
    };
    while !stalled.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    editor
        .update_elements(vec![ElementUpdate::new(id).position(99.0, 99.0)])
        .expect("move");
    locker.join().expect("locker");

    let element = editor.element(id).expect("element");
    assert!(element.locked, "lock update lost");
    assert!((element.transform.x - 99.0).abs() < f32::EPSILON, "position update lost");
    assert!((element.transform.y - 99.0).abs() < f32::EPSILON, "position update lost");
    assert_eq!(editor.stats().update_batches, 2);
}
