//! Live editor handle over a shared [`Scene`].
//!
//! [`Editor`] is the mutation surface other components build on: batch
//! creation and update of assets and elements, side-effect registration,
//! paint-order queries and camera control. It is cheaply cloneable and can
//! be shared across tasks.
//!
//! Every batch call validates all of its records before applying any of
//! them, so a failed call leaves the scene untouched. Handlers registered
//! through [`Editor::register_before_change`] and friends run after the
//! internal lock is released and may call back into the editor.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::side_effects::{HookId, SideEffects};
use crate::{
    Asset, AssetId, Camera, CameraConstraints, CanvasError, CanvasResult, ContainerId, Element,
    ElementId, ElementUpdate, OrderIndex, Scene,
};

/// Maximum nesting of hook-triggered mutations before hooks are skipped.
const MAX_HOOK_DEPTH: usize = 16;

/// How many times an update batch is rebuilt when its targets change
/// underneath it.
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Counters of applied mutation batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorStats {
    /// Number of successful `create_assets` calls.
    pub asset_batches: u64,
    /// Number of successful `create_elements` calls.
    pub create_batches: u64,
    /// Number of successful, non-empty `update_elements` calls.
    pub update_batches: u64,
}

#[derive(Default)]
struct Counters {
    asset_batches: AtomicU64,
    create_batches: AtomicU64,
    update_batches: AtomicU64,
}

struct Inner {
    scene: RwLock<Scene>,
    side_effects: RwLock<SideEffects>,
    counters: Counters,
    hook_depth: AtomicUsize,
    disposed: AtomicBool,
}

/// Shared handle to one live document.
#[derive(Clone)]
pub struct Editor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("disposed", &self.is_disposed())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Non-owning handle to an [`Editor`], used by hooks to avoid reference cycles.
#[derive(Clone, Default)]
pub struct WeakEditor {
    inner: Weak<Inner>,
}

impl WeakEditor {
    /// Upgrade to a live editor, if it still exists and is not disposed.
    #[must_use]
    pub fn upgrade(&self) -> Option<Editor> {
        self.inner
            .upgrade()
            .map(|inner| Editor { inner })
            .filter(|e| !e.is_disposed())
    }
}

impl std::fmt::Debug for WeakEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakEditor")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Registration of one handler. Unregisters on [`Subscription::unsubscribe`]
/// or when dropped.
#[derive(Debug)]
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    editor: WeakEditor,
    id: Option<HookId>,
}

impl Subscription {
    /// Remove the handler. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(inner) = self.editor.inner.upgrade() {
                write_lock(&inner.side_effects).remove(id);
            }
        }
    }

    /// Whether the handler is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.editor.inner.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Scene::default())
    }
}

impl Editor {
    /// Create an editor over `scene`.
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self {
            inner: Arc::new(Inner {
                scene: RwLock::new(scene),
                side_effects: RwLock::new(SideEffects::default()),
                counters: Counters::default(),
                hook_depth: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Non-owning handle to this editor.
    #[must_use]
    pub fn downgrade(&self) -> WeakEditor {
        WeakEditor {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same editor.
    #[must_use]
    pub fn same_as(&self, other: &Editor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Tear the editor down: every handler is dropped and later mutations
    /// fail with [`CanvasError::Disposed`]. Idempotent.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            write_lock(&self.inner.side_effects).clear();
            tracing::debug!("Editor disposed");
        }
    }

    /// Whether [`Editor::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> CanvasResult<()> {
        if self.is_disposed() {
            Err(CanvasError::Disposed)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Snapshot of the whole scene.
    #[must_use]
    pub fn scene(&self) -> Scene {
        self.read_scene().clone()
    }

    /// Get an element by ID.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.read_scene().get_element(id).cloned()
    }

    /// Get an asset by ID.
    #[must_use]
    pub fn asset(&self, id: AssetId) -> Option<Asset> {
        self.read_scene().get_asset(id).cloned()
    }

    /// Every element matching `filter`.
    #[must_use]
    pub fn elements_where(&self, filter: impl Fn(&Element) -> bool) -> Vec<Element> {
        self.read_scene()
            .elements()
            .filter(|e| filter(e))
            .cloned()
            .collect()
    }

    /// The container currently shown.
    #[must_use]
    pub fn current_container(&self) -> ContainerId {
        self.read_scene().current_container()
    }

    /// Children of `container`, bottom-most first.
    #[must_use]
    pub fn elements_in_paint_order(&self, container: ContainerId) -> Vec<Element> {
        self.read_scene()
            .children_in_paint_order(container)
            .into_iter()
            .cloned()
            .collect()
    }

    /// A fresh index above every child of `container`.
    #[must_use]
    pub fn next_top_index(&self, container: ContainerId) -> OrderIndex {
        self.read_scene()
            .top_index(container)
            .map_or_else(OrderIndex::default, |top| top.above())
    }

    /// `count` ascending indices strictly between `lower` and `upper`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidIndex`] if `lower >= upper`.
    pub fn indices_between(
        &self,
        lower: Option<&OrderIndex>,
        upper: Option<&OrderIndex>,
        count: usize,
    ) -> CanvasResult<Vec<OrderIndex>> {
        OrderIndex::n_between(lower, upper, count)
    }

    /// Mutation counters.
    #[must_use]
    pub fn stats(&self) -> EditorStats {
        let c = &self.inner.counters;
        EditorStats {
            asset_batches: c.asset_batches.load(Ordering::SeqCst),
            create_batches: c.create_batches.load(Ordering::SeqCst),
            update_batches: c.update_batches.load(Ordering::SeqCst),
        }
    }

    // -----------------------------------------------------------------------
    // Batch mutations
    // -----------------------------------------------------------------------

    /// Create assets. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateId`] if any ID is already used (also
    /// within the batch) and [`CanvasError::Disposed`] after teardown.
    pub fn create_assets(&self, assets: Vec<Asset>) -> CanvasResult<()> {
        self.ensure_live()?;
        {
            let mut scene = self.write_scene();
            let mut seen = std::collections::HashSet::new();
            for asset in &assets {
                if scene.has_asset(asset.id) || !seen.insert(asset.id) {
                    return Err(CanvasError::DuplicateId(asset.id.to_string()));
                }
            }
            for asset in assets {
                scene.add_asset(asset)?;
            }
        }
        self.inner.counters.asset_batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Delete assets. Unknown IDs are ignored. Still allowed after teardown
    /// so in-flight work can remove what it already placed.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible alongside the other batch calls.
    pub fn delete_assets(&self, ids: &[AssetId]) -> CanvasResult<()> {
        let mut scene = self.write_scene();
        for id in ids {
            let _ = scene.remove_asset(id);
        }
        Ok(())
    }

    /// Create elements, then run after-create handlers. All or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateId`] or [`CanvasError::AssetNotFound`]
    /// if any element cannot be inserted, and [`CanvasError::Disposed`] after
    /// teardown.
    pub fn create_elements(&self, elements: Vec<Element>) -> CanvasResult<()> {
        self.ensure_live()?;
        if elements.is_empty() {
            return Ok(());
        }
        {
            let mut scene = self.write_scene();
            let mut seen = std::collections::HashSet::new();
            for element in &elements {
                scene.check_insertable(element)?;
                if !seen.insert(element.id) {
                    return Err(CanvasError::DuplicateId(element.id.to_string()));
                }
            }
            for element in &elements {
                scene.add_element(element.clone())?;
            }
        }
        self.inner.counters.create_batches.fetch_add(1, Ordering::SeqCst);

        self.with_hooks(|| {
            let handlers = read_lock(&self.inner.side_effects).after_create_handlers();
            for element in &elements {
                for handler in &handlers {
                    handler(element);
                }
            }
        });
        Ok(())
    }

    /// Apply partial updates. Before-change handlers may rewrite each
    /// proposed record; after-change handlers observe the applied ones.
    /// All or nothing.
    ///
    /// Handlers run without the scene lock held. If another writer changes
    /// one of the targeted elements in the meantime, the batch is rebuilt
    /// from the fresh records and the handlers run again, so concurrent
    /// updates to the same element are never lost.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ElementNotFound`] for unknown IDs,
    /// [`CanvasError::InvalidOperation`] for updates that do not fit the
    /// element, [`CanvasError::Conflict`] if the targeted elements keep
    /// changing underneath the batch, and [`CanvasError::Disposed`] after
    /// teardown.
    pub fn update_elements(&self, updates: Vec<ElementUpdate>) -> CanvasResult<()> {
        self.ensure_live()?;
        if updates.is_empty() {
            return Ok(());
        }

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut changes = self.propose_updates(&updates)?;

            let interceptors =
                read_lock(&self.inner.side_effects).before_change_handlers();
            for (current, proposed) in &mut changes {
                for interceptor in &interceptors {
                    *proposed = interceptor(current, proposed.clone());
                }
                proposed.id = current.id;
            }

            {
                let mut scene = self.write_scene();
                if let Some((missing, _)) = changes
                    .iter()
                    .find(|(c, _)| scene.get_element(c.id).is_none())
                {
                    return Err(CanvasError::ElementNotFound(missing.id.to_string()));
                }
                let stale = changes
                    .iter()
                    .any(|(c, _)| scene.get_element(c.id) != Some(c));
                if stale {
                    tracing::debug!(attempt, "Elements changed during update, retrying");
                    continue;
                }
                for (_, next) in &changes {
                    scene.replace_element(next.clone())?;
                }
            }
            self.inner.counters.update_batches.fetch_add(1, Ordering::SeqCst);

            self.with_hooks(|| {
                let handlers =
                    read_lock(&self.inner.side_effects).after_change_handlers();
                for (previous, current) in &changes {
                    for handler in &handlers {
                        handler(previous, current);
                    }
                }
            });
            return Ok(());
        }

        tracing::warn!(
            attempts = MAX_UPDATE_ATTEMPTS,
            "Giving up on update batch under contention"
        );
        Err(CanvasError::Conflict(MAX_UPDATE_ATTEMPTS))
    }

    fn propose_updates(
        &self,
        updates: &[ElementUpdate],
    ) -> CanvasResult<Vec<(Element, Element)>> {
        let scene = self.read_scene();
        updates
            .iter()
            .map(|update| {
                let current = scene
                    .get_element(update.id)
                    .ok_or_else(|| CanvasError::ElementNotFound(update.id.to_string()))?;
                Ok((current.clone(), update.apply(current)?))
            })
            .collect()
    }

    /// Delete elements. Unknown IDs are ignored. Still allowed after teardown
    /// so in-flight work can remove what it already placed.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible alongside the other batch calls.
    pub fn delete_elements(&self, ids: &[ElementId]) -> CanvasResult<()> {
        let mut scene = self.write_scene();
        for id in ids {
            let _ = scene.remove_element(id);
        }
        Ok(())
    }

    fn with_hooks(&self, run: impl FnOnce()) {
        let depth = self.inner.hook_depth.fetch_add(1, Ordering::SeqCst);
        if depth < MAX_HOOK_DEPTH {
            run();
        } else {
            tracing::warn!(depth, "Hook recursion limit reached; skipping handlers");
        }
        self.inner.hook_depth.fetch_sub(1, Ordering::SeqCst);
    }

    // -----------------------------------------------------------------------
    // Side effects
    // -----------------------------------------------------------------------

    /// Register a handler that may rewrite every proposed element change.
    pub fn register_before_change(
        &self,
        handler: impl Fn(&Element, Element) -> Element + Send + Sync + 'static,
    ) -> Subscription {
        let id = write_lock(&self.inner.side_effects).add_before_change(Arc::new(handler));
        self.subscription(id)
    }

    /// Register a handler run after each element creation.
    pub fn register_after_create(
        &self,
        handler: impl Fn(&Element) + Send + Sync + 'static,
    ) -> Subscription {
        let id = write_lock(&self.inner.side_effects).add_after_create(Arc::new(handler));
        self.subscription(id)
    }

    /// Register a handler run after each applied element change.
    pub fn register_after_change(
        &self,
        handler: impl Fn(&Element, &Element) + Send + Sync + 'static,
    ) -> Subscription {
        let id = write_lock(&self.inner.side_effects).add_after_change(Arc::new(handler));
        self.subscription(id)
    }

    /// Register a listener run after each camera movement.
    pub fn register_camera_listener(
        &self,
        listener: impl Fn(&Camera) + Send + Sync + 'static,
    ) -> Subscription {
        let id = write_lock(&self.inner.side_effects).add_camera_listener(Arc::new(listener));
        self.subscription(id)
    }

    /// Number of registered handlers of all kinds.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        read_lock(&self.inner.side_effects).len()
    }

    fn subscription(&self, id: HookId) -> Subscription {
        Subscription {
            editor: self.downgrade(),
            id: Some(id),
        }
    }

    // -----------------------------------------------------------------------
    // Camera and viewport
    // -----------------------------------------------------------------------

    /// Current camera.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.read_scene().camera()
    }

    /// Current zoom level.
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.camera().zoom
    }

    /// Viewport width in pixels.
    #[must_use]
    pub fn viewport_width(&self) -> f32 {
        self.read_scene().viewport_width
    }

    /// Resize the viewport.
    pub fn set_viewport(&self, width: f32, height: f32) {
        let camera = {
            let mut scene = self.write_scene();
            scene.set_viewport(width, height);
            scene.camera()
        };
        self.notify_camera(&camera);
    }

    /// Move the camera, honoring the active constraint.
    pub fn set_camera(&self, camera: Camera) {
        let camera = {
            let mut scene = self.write_scene();
            scene.set_camera(camera);
            scene.camera()
        };
        self.notify_camera(&camera);
    }

    /// Change only the zoom level.
    pub fn set_zoom(&self, zoom: f32) {
        let camera = Camera {
            zoom,
            ..self.camera()
        };
        self.set_camera(camera);
    }

    /// Install or remove the camera constraint. The camera is not moved
    /// until the next [`Editor::reset_camera`] or camera change.
    pub fn set_camera_constraints(&self, constraints: Option<CameraConstraints>) {
        self.write_scene().set_camera_constraints(constraints);
    }

    /// Active camera constraint.
    #[must_use]
    pub fn camera_constraints(&self) -> Option<CameraConstraints> {
        self.read_scene().camera_constraints().copied()
    }

    /// Reset the camera so it satisfies the active constraint.
    pub fn reset_camera(&self) {
        let camera = {
            let mut scene = self.write_scene();
            scene.reset_camera();
            scene.camera()
        };
        self.notify_camera(&camera);
    }

    fn notify_camera(&self, camera: &Camera) {
        let listeners = read_lock(&self.inner.side_effects).camera_listeners();
        for listener in &listeners {
            listener(camera);
        }
    }

    fn read_scene(&self) -> RwLockReadGuard<'_, Scene> {
        read_lock(&self.inner.scene)
    }

    fn write_scene(&self) -> RwLockWriteGuard<'_, Scene> {
        write_lock(&self.inner.scene)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::{AssetSource, ElementKind};

    fn note(editor: &Editor, content: &str) -> Element {
        Element::new(
            ElementKind::Text {
                content: content.to_string(),
                font_size: 16.0,
                color: "#000000".to_string(),
            },
            editor.current_container(),
        )
        .with_index(editor.next_top_index(editor.current_container()))
    }

    fn asset() -> Asset {
        Asset::new(
            AssetId::new(),
            "bitmap",
            AssetSource {
                src: "data:image/png;base64,".to_string(),
                mime_type: "image/png".to_string(),
                width: 4,
                height: 4,
            },
        )
    }

    #[test]
    fn test_create_elements_is_all_or_nothing() {
        let editor = Editor::default();
        let good = note(&editor, "good");
        let bad = Element::new(
            ElementKind::Image {
                asset_id: AssetId::new(),
            },
            editor.current_container(),
        );
        let result = editor.create_elements(vec![good.clone(), bad]);
        assert!(matches!(result, Err(CanvasError::AssetNotFound(_))));
        assert!(editor.element(good.id).is_none());
        assert_eq!(editor.stats().create_batches, 0);
    }

    #[test]
    fn test_duplicate_asset_in_batch_rejected() {
        let editor = Editor::default();
        let a = asset();
        let result = editor.create_assets(vec![a.clone(), a.clone()]);
        assert!(matches!(result, Err(CanvasError::DuplicateId(_))));
        assert!(editor.asset(a.id).is_none());
    }

    #[test]
    fn test_update_unknown_element_fails() {
        let editor = Editor::default();
        let result =
            editor.update_elements(vec![ElementUpdate::new(ElementId::new()).locked(true)]);
        assert!(matches!(result, Err(CanvasError::ElementNotFound(_))));
        assert_eq!(editor.stats().update_batches, 0);
    }

    #[test]
    fn test_before_change_rewrites_proposal() {
        let editor = Editor::default();
        let element = note(&editor, "pinned").with_locked(true);
        let id = element.id;
        editor.create_elements(vec![element]).expect("create");

        let _guard = editor.register_before_change(|_, mut next| {
            next.locked = true;
            next
        });
        editor
            .update_elements(vec![ElementUpdate::new(id).locked(false).position(5.0, 6.0)])
            .expect("update");

        let stored = editor.element(id).expect("exists");
        assert!(stored.locked);
        assert!((stored.transform.x - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hooks_may_mutate_reentrantly() {
        let editor = Editor::default();
        let element = note(&editor, "follow");
        let id = element.id;
        editor.create_elements(vec![element]).expect("create");

        let weak = editor.downgrade();
        let _guard = editor.register_after_change(move |_, current| {
            if !current.locked {
                if let Some(editor) = weak.upgrade() {
                    editor
                        .update_elements(vec![ElementUpdate::new(current.id).locked(true)])
                        .expect("nested update");
                }
            }
        });

        editor
            .update_elements(vec![ElementUpdate::new(id).position(1.0, 1.0)])
            .expect("update");
        assert!(editor.element(id).expect("exists").locked);
        assert_eq!(editor.stats().update_batches, 2);
    }

    #[test]
    fn test_subscription_drop_unregisters() {
        let editor = Editor::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut sub = editor.register_after_create(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        editor.create_elements(vec![note(&editor, "one")]).expect("create");
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        editor.create_elements(vec![note(&editor, "two")]).expect("create");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(editor.handler_count(), 0);
    }

    #[test]
    fn test_camera_listener_sees_zoom() {
        let editor = Editor::default();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _guard = editor.register_camera_listener(move |camera| {
            write_lock(&sink).push(camera.zoom);
        });
        editor.set_zoom(2.0);
        editor.set_zoom(0.5);
        assert_eq!(*read_lock(&seen), vec![2.0, 0.5]);
    }

    #[test]
    fn test_disposed_editor_rejects_mutations() {
        let editor = Editor::default();
        let placed = asset();
        let placed_id = placed.id;
        editor.create_assets(vec![placed]).expect("asset");
        let weak = editor.downgrade();
        editor.dispose();
        editor.dispose();
        assert!(weak.upgrade().is_none());
        assert!(matches!(
            editor.create_assets(vec![asset()]),
            Err(CanvasError::Disposed)
        ));

        editor.delete_assets(&[placed_id]).expect("cleanup after dispose");
        assert!(editor.asset(placed_id).is_none());
    }
}
