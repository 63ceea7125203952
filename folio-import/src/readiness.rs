//! Bounded waiting for asynchronously constructed collaborators.
//!
//! The live editor is mounted by the host some time after an import may be
//! requested. [`CollaboratorSlot`] is the explicit, injectable reference the
//! host fills and clears; [`ReadinessGate`] polls it under a
//! [`RetryPolicy`] without blocking other tasks.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use folio_core::Editor;
use serde::{Deserialize, Serialize};

/// Polling budget for a readiness wait.
///
/// Each attempt checks the condition once and, if it does not hold, waits
/// before the next attempt. The wait after attempt `n` (0-indexed) is
/// `initial_delay_ms * backoff_multiplier^n`, capped at `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Number of checks before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed check, in milliseconds.
    pub initial_delay_ms: u64,
    /// Cap on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor applied to the delay after each failed check.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(10, Duration::from_millis(100))
    }
}

impl RetryPolicy {
    /// Check up to `max_attempts` times, `delay` apart.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            max_attempts,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay after a failed check (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay_ms as f64;
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (base_delay * multiplier).min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }

    /// Longest time a wait under this policy can take.
    #[must_use]
    pub fn total_budget(&self) -> Duration {
        (0..self.max_attempts).map(|a| self.delay_for_attempt(a)).sum()
    }
}

/// Poll `condition` under `policy`.
///
/// Returns `true` as soon as the condition holds and `false` once the
/// attempts are exhausted. The sleeps are suspension points, so other tasks
/// keep running while this waits.
pub async fn await_condition<F>(policy: &RetryPolicy, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for attempt in 0..policy.max_attempts {
        if condition() {
            tracing::debug!(attempt, "Readiness condition met");
            return true;
        }
        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
    }
    tracing::debug!(attempts = policy.max_attempts, "Readiness attempts exhausted");
    false
}

/// Shared, injectable reference to a collaborator that appears and
/// disappears over time.
///
/// The host sets it when the collaborator is mounted and clears it on
/// teardown; consumers only read it.
#[derive(Debug)]
pub struct CollaboratorSlot<T> {
    inner: Arc<RwLock<Option<T>>>,
}

impl<T> Clone for CollaboratorSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for CollaboratorSlot<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }
}

impl<T: Clone> CollaboratorSlot<T> {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a collaborator, replacing any previous one.
    pub fn set(&self, value: T) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    /// Unmount the collaborator, returning it.
    pub fn clear(&self) -> Option<T> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The mounted collaborator, if any.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a collaborator is mounted.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Slot holding the live editor.
pub type EditorSlot = CollaboratorSlot<Editor>;

/// Barrier awaiting the live editor before any canvas mutation.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    slot: EditorSlot,
}

impl ReadinessGate {
    /// Create a gate reading `slot`.
    #[must_use]
    pub fn new(slot: EditorSlot) -> Self {
        Self { slot }
    }

    /// The slot this gate reads.
    #[must_use]
    pub fn slot(&self) -> &EditorSlot {
        &self.slot
    }

    /// Wait until a live editor is mounted. A disposed editor left in the
    /// slot does not count. Returns `false` on exhaustion.
    pub async fn await_ready(&self, policy: &RetryPolicy) -> bool {
        self.await_editor(policy).await.is_some()
    }

    /// Wait until a live editor is mounted and return it.
    pub async fn await_editor(&self, policy: &RetryPolicy) -> Option<Editor> {
        let mut found = None;
        let ready = await_condition(policy, || {
            found = self.slot.current().filter(|e| !e.is_disposed());
            found.is_some()
        })
        .await;
        if ready {
            found
        } else {
            None
        }
    }
}
