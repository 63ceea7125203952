//! Zoom-driven quality tiers for imported pages.
//!
//! [`QualityTierManager`] maps the camera zoom to a [`QualityTier`] and
//! updates every imported page element whose tier differs. It reacts to
//! camera changes (debounced) and also polls on a fixed interval as a
//! fallback. Updates touch only the tier; placement, lock state and paint
//! order are carried over unchanged.

use std::sync::Arc;
use std::time::Duration;

use folio_core::{CanvasResult, Editor, ElementUpdate, QualityTier, Subscription, WeakEditor};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Below this zoom pages display the low tier.
pub const LOW_TIER_BELOW: f32 = 0.8;

/// Above this zoom pages display the high tier.
pub const HIGH_TIER_ABOVE: f32 = 1.5;

/// Tier to display at `zoom`.
#[must_use]
pub fn tier_for_zoom(zoom: f32) -> QualityTier {
    if zoom < LOW_TIER_BELOW {
        QualityTier::Low
    } else if zoom > HIGH_TIER_ABOVE {
        QualityTier::High
    } else {
        QualityTier::Medium
    }
}

/// Timing of the tier observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Fallback polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Quiet period after the last camera change before observing, in
    /// milliseconds.
    pub debounce_ms: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            debounce_ms: 100,
        }
    }
}

impl QualityConfig {
    /// Polling interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Debounce window.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Keeps imported page tiers in line with the zoom level.
#[derive(Debug)]
pub struct QualityTierManager {
    editor: WeakEditor,
    config: QualityConfig,
    task: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
}

impl QualityTierManager {
    /// Create a stopped manager for `editor`.
    #[must_use]
    pub fn new(editor: &Editor, config: QualityConfig) -> Self {
        Self {
            editor: editor.downgrade(),
            config,
            task: None,
            subscription: None,
        }
    }

    /// Observe the current zoom once.
    ///
    /// Returns the number of elements updated; `0` when every page already
    /// shows the right tier or the editor is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier update is rejected.
    pub fn observe(&self) -> CanvasResult<usize> {
        match self.editor.upgrade() {
            Some(editor) => observe_zoom(&editor, editor.zoom()),
            None => Ok(0),
        }
    }

    /// Start observing camera changes and polling. Must be called within a
    /// Tokio runtime. Does nothing if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let Some(editor) = self.editor.upgrade() else {
            return;
        };

        let notify = Arc::new(Notify::new());
        let signal = Arc::clone(&notify);
        self.subscription = Some(editor.register_camera_listener(move |_| signal.notify_one()));

        let weak = self.editor.clone();
        let config = self.config;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.poll_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    () = notify.notified() => {
                        loop {
                            tokio::select! {
                                () = notify.notified() => {}
                                () = tokio::time::sleep(config.debounce()) => break,
                            }
                        }
                    }
                }

                let Some(editor) = weak.upgrade() else {
                    tracing::debug!("Editor gone; quality observer exiting");
                    break;
                };
                if let Err(e) = observe_zoom(&editor, editor.zoom()) {
                    tracing::warn!(error = %e, "Quality tier update failed");
                }
            }
        }));
        tracing::debug!(
            poll_ms = config.poll_interval_ms,
            debounce_ms = config.debounce_ms,
            "Quality tier manager started"
        );
    }

    /// Stop observing. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Quality tier manager stopped");
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Whether the observer task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for QualityTierManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bring every imported page in `editor` to the tier for `zoom`, in one
/// batch. Returns the number of elements updated.
///
/// # Errors
///
/// Returns an error if the tier update is rejected.
pub fn observe_zoom(editor: &Editor, zoom: f32) -> CanvasResult<usize> {
    let target = tier_for_zoom(zoom);
    let updates: Vec<ElementUpdate> = editor
        .elements_where(|e| e.kind.quality().is_some_and(|q| q != target))
        .into_iter()
        .map(|e| ElementUpdate::new(e.id).quality(target))
        .collect();

    if updates.is_empty() {
        return Ok(0);
    }
    let count = updates.len();
    tracing::debug!(zoom, tier = %target, pages = count, "Switching page quality tier");
    editor.update_elements(updates)?;
    Ok(count)
}
