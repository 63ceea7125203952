//! Standing invariants over one imported object set.
//!
//! While registered, an [`InvariantEngine`] keeps every member element
//! locked, keeps the members painted beneath every other child of the
//! current container, and holds the camera to the members' combined bounds.
//! Violating mutations are corrected, never reported.

use std::sync::Arc;

use folio_core::{
    CameraConstraints, CanvasResult, Editor, ElementUpdate, OrderIndex, Rect, Subscription,
    WeakEditor,
};
use serde::{Deserialize, Serialize};

use crate::materializer::ImportedObjectSet;

/// Padding policy of the camera containment constraint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPolicy {
    /// Viewports narrower than this get the narrow horizontal padding.
    pub narrow_width_threshold: f32,
    /// Horizontal padding on narrow viewports.
    pub narrow_padding_x: f32,
    /// Horizontal padding on wide viewports.
    pub wide_padding_x: f32,
    /// Vertical padding.
    pub padding_y: f32,
}

impl Default for CameraPolicy {
    fn default() -> Self {
        Self {
            narrow_width_threshold: 840.0,
            narrow_padding_x: 16.0,
            wide_padding_x: 164.0,
            padding_y: 64.0,
        }
    }
}

impl CameraPolicy {
    /// Padding `(x, y)` for a viewport of the given width.
    #[must_use]
    pub fn padding_for(&self, viewport_width: f32) -> (f32, f32) {
        let x = if viewport_width < self.narrow_width_threshold {
            self.narrow_padding_x
        } else {
            self.wide_padding_x
        };
        (x, self.padding_y)
    }

    /// Containment constraint around `bounds`.
    #[must_use]
    pub fn constraint_for(&self, bounds: Rect, viewport_width: f32) -> CameraConstraints {
        let (x, y) = self.padding_for(viewport_width);
        CameraConstraints::contain(bounds, x, y)
    }
}

/// Registration state of an [`InvariantEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No hooks installed.
    Unregistered,
    /// Hooks installed and enforcing.
    Enforcing,
}

/// Enforces lock, paint-order and camera invariants for one import.
#[derive(Debug)]
pub struct InvariantEngine {
    members: Arc<ImportedObjectSet>,
    subscriptions: Vec<Subscription>,
    state: EngineState,
    camera_bounds: Option<Rect>,
}

impl InvariantEngine {
    /// Install the interceptors on `editor` and apply every invariant once.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial paint-order correction is rejected.
    pub fn register(
        editor: &Editor,
        members: Arc<ImportedObjectSet>,
        camera: &CameraPolicy,
    ) -> CanvasResult<Self> {
        let mut subscriptions = Vec::with_capacity(3);

        let locked = Arc::clone(&members);
        subscriptions.push(editor.register_before_change(move |_, mut next| {
            if !next.locked && locked.contains(next.id) {
                tracing::debug!(element = %next.id, "Re-locking imported page");
                next.locked = true;
            }
            next
        }));

        let (weak, ordered) = (editor.downgrade(), Arc::clone(&members));
        subscriptions.push(editor.register_after_create(move |_| {
            reorder_from_hook(&weak, &ordered);
        }));

        let (weak, ordered) = (editor.downgrade(), Arc::clone(&members));
        subscriptions.push(editor.register_after_change(move |_, _| {
            reorder_from_hook(&weak, &ordered);
        }));

        let mut engine = Self {
            members,
            subscriptions,
            state: EngineState::Enforcing,
            camera_bounds: None,
        };

        enforce_z_order(editor, &engine.members)?;
        engine.camera_bounds = apply_camera_containment(editor, &engine.members, camera);

        tracing::debug!(
            members = engine.members.len(),
            bounds = ?engine.camera_bounds,
            "Invariant engine registered"
        );
        Ok(engine)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The tracked object set.
    #[must_use]
    pub fn members(&self) -> &ImportedObjectSet {
        &self.members
    }

    /// Bounds the camera was constrained to at registration.
    #[must_use]
    pub fn camera_bounds(&self) -> Option<Rect> {
        self.camera_bounds
    }

    /// Remove every interceptor. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == EngineState::Unregistered {
            return;
        }
        for mut subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.state = EngineState::Unregistered;
        tracing::debug!(members = self.members.len(), "Invariant engine unregistered");
    }
}

impl Drop for InvariantEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn reorder_from_hook(editor: &WeakEditor, members: &ImportedObjectSet) {
    let Some(editor) = editor.upgrade() else {
        return;
    };
    if let Err(e) = enforce_z_order(&editor, members) {
        tracing::warn!(error = %e, "Failed to restore imported page order");
    }
}

/// Move the members of `members` in the current container beneath every
/// other child, keeping their own relative order.
///
/// Returns whether an update was issued. Nothing is issued when the members
/// already occupy the bottom slots or when there is no other child.
///
/// # Errors
///
/// Returns an error if the index update is rejected.
pub fn enforce_z_order(editor: &Editor, members: &ImportedObjectSet) -> CanvasResult<bool> {
    let siblings = editor.elements_in_paint_order(editor.current_container());
    let owned: Vec<_> = siblings
        .iter()
        .filter(|e| members.contains(e.id))
        .collect();
    if owned.is_empty() {
        return Ok(false);
    }

    let at_bottom = siblings
        .iter()
        .take(owned.len())
        .map(|e| e.id)
        .eq(owned.iter().map(|e| e.id));
    if at_bottom {
        return Ok(false);
    }

    let Some(lowest_other) = siblings.iter().find(|e| !members.contains(e.id)) else {
        return Ok(false);
    };

    let indices = OrderIndex::n_between(None, Some(&lowest_other.index), owned.len())?;
    let updates: Vec<ElementUpdate> = owned
        .iter()
        .zip(indices)
        .map(|(e, index)| ElementUpdate::new(e.id).index(index))
        .collect();

    tracing::debug!(
        pages = updates.len(),
        below = %lowest_other.index,
        "Restoring imported pages to the bottom"
    );
    editor.update_elements(updates)?;
    Ok(true)
}

/// Constrain the camera to the union of the members' bounds and reset it.
///
/// Returns the bounds used, or `None` if no member exists in the document.
pub fn apply_camera_containment(
    editor: &Editor,
    members: &ImportedObjectSet,
    policy: &CameraPolicy,
) -> Option<Rect> {
    let rects: Vec<Rect> = members
        .ids()
        .iter()
        .filter_map(|id| editor.element(*id))
        .map(|e| e.bounds())
        .collect();
    let bounds = Rect::union_all(&rects)?;

    let constraint = policy.constraint_for(bounds, editor.viewport_width());
    editor.set_camera_constraints(Some(constraint));
    editor.reset_camera();
    Some(bounds)
}
