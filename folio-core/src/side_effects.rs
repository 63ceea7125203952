//! Reactive hooks on element records.
//!
//! Three kinds of handler exist, mirroring the points in a mutation where a
//! collaborator may want to step in:
//!
//! - **before change** handlers receive the current record and the proposed
//!   next record and return the record that is actually applied;
//! - **after create** handlers observe every newly created element;
//! - **after change** handlers observe every applied update.
//!
//! A fourth listener kind observes camera changes. Handlers are stored here
//! and invoked by [`crate::Editor`] outside of its internal lock.

use std::sync::Arc;

use crate::{Camera, Element};

/// Rewrites a proposed change `(current, proposed) -> applied`.
pub type BeforeChangeHandler = Arc<dyn Fn(&Element, Element) -> Element + Send + Sync>;

/// Observes a freshly created element.
pub type AfterCreateHandler = Arc<dyn Fn(&Element) + Send + Sync>;

/// Observes an applied change `(previous, current)`.
pub type AfterChangeHandler = Arc<dyn Fn(&Element, &Element) + Send + Sync>;

/// Observes the camera after it moved.
pub type CameraListener = Arc<dyn Fn(&Camera) + Send + Sync>;

/// Handle identifying one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Registry of all handlers attached to one editor.
#[derive(Default)]
pub struct SideEffects {
    next_id: u64,
    before_change: Vec<(HookId, BeforeChangeHandler)>,
    after_create: Vec<(HookId, AfterCreateHandler)>,
    after_change: Vec<(HookId, AfterChangeHandler)>,
    camera: Vec<(HookId, CameraListener)>,
}

impl std::fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffects")
            .field("before_change", &self.before_change.len())
            .field("after_create", &self.after_create.len())
            .field("after_change", &self.after_change.len())
            .field("camera", &self.camera.len())
            .finish()
    }
}

impl SideEffects {
    fn allocate(&mut self) -> HookId {
        self.next_id += 1;
        HookId(self.next_id)
    }

    /// Register a before-change handler.
    pub fn add_before_change(&mut self, handler: BeforeChangeHandler) -> HookId {
        let id = self.allocate();
        self.before_change.push((id, handler));
        id
    }

    /// Register an after-create handler.
    pub fn add_after_create(&mut self, handler: AfterCreateHandler) -> HookId {
        let id = self.allocate();
        self.after_create.push((id, handler));
        id
    }

    /// Register an after-change handler.
    pub fn add_after_change(&mut self, handler: AfterChangeHandler) -> HookId {
        let id = self.allocate();
        self.after_change.push((id, handler));
        id
    }

    /// Register a camera listener.
    pub fn add_camera_listener(&mut self, listener: CameraListener) -> HookId {
        let id = self.allocate();
        self.camera.push((id, listener));
        id
    }

    /// Remove a handler of any kind. Returns whether it was registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.len();
        self.before_change.retain(|(h, _)| *h != id);
        self.after_create.retain(|(h, _)| *h != id);
        self.after_change.retain(|(h, _)| *h != id);
        self.camera.retain(|(h, _)| *h != id);
        self.len() != before
    }

    /// Drop every handler.
    pub fn clear(&mut self) {
        self.before_change.clear();
        self.after_create.clear();
        self.after_change.clear();
        self.camera.clear();
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.before_change.len()
            + self.after_create.len()
            + self.after_change.len()
            + self.camera.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the before-change handlers, in registration order.
    #[must_use]
    pub fn before_change_handlers(&self) -> Vec<BeforeChangeHandler> {
        self.before_change.iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    /// Snapshot of the after-create handlers, in registration order.
    #[must_use]
    pub fn after_create_handlers(&self) -> Vec<AfterCreateHandler> {
        self.after_create.iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    /// Snapshot of the after-change handlers, in registration order.
    #[must_use]
    pub fn after_change_handlers(&self) -> Vec<AfterChangeHandler> {
        self.after_change.iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    /// Snapshot of the camera listeners, in registration order.
    #[must_use]
    pub fn camera_listeners(&self) -> Vec<CameraListener> {
        self.camera.iter().map(|(_, h)| Arc::clone(h)).collect()
    }
}
