// Lifecycle state module
//
// This module provides the LifecycleManager which guards the session's
// LifecycleState behind a mutex, wakes blocked waiters through a condition
// variable and emits change events through a broadcast channel.

use crate::models::{LifecycleState, RuntimeState, WindowHandle};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

/// Change events emitted when the lifecycle moves
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleChange {
    /// The state machine moved from one state to another
    Transitioned { from: LifecycleState, to: LifecycleState },

    /// A window creation attempt failed
    CreateAttemptFailed {
        attempt: u32,
        error: String,
        will_retry: bool,
    },

    /// The first shutdown request was accepted
    ShutdownRequested,

    /// Teardown completed and the close handler (if any) has fired
    Finished,
}

/// Rejected state machine move
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug)]
struct Inner {
    state: LifecycleState,
    shutdown_requested: bool,
    finished: bool,
    last_error: Option<String>,
    window: Option<WindowHandle>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: LifecycleState::NotStarted,
            shutdown_requested: false,
            finished: false,
            last_error: None,
            window: None,
        }
    }
}

/// Thread-safe lifecycle state with blocking waits and event emission
///
/// Every mutation notifies all condition-variable waiters, so readiness
/// waits, start waits and shutdown-completion waits share one wake-up path.
/// A shutdown request wakes every waiter regardless of what it waits for.
///
/// # Related Types
///
/// - [`crate::models::LifecycleState`]: the state machine itself
/// - [`LifecycleChange`]: events emitted on every move
/// - [`crate::ui::WindowLifecycleController`]: the sole writer
pub struct LifecycleManager {
    inner: Arc<Mutex<Inner>>,
    changed: Arc<Condvar>,
    change_tx: broadcast::Sender<LifecycleChange>,
}

impl LifecycleManager {
    /// Create a manager in `NotStarted` with a broadcast buffer of 64 events
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            changed: Arc::new(Condvar::new()),
            change_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, change: LifecycleChange) {
        // Nobody listening is fine
        let _ = self.change_tx.send(change);
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&self, to: LifecycleState) -> Result<LifecycleState, InvalidTransition> {
        let from = {
            let mut inner = self.lock();
            let from = inner.state;
            if !from.can_transition_to(to) {
                return Err(InvalidTransition { from, to });
            }
            inner.state = to;
            from
        };
        self.changed.notify_all();

        if from != to {
            tracing::info!(%from, %to, "lifecycle transition");
        }
        self.emit(LifecycleChange::Transitioned { from, to });
        Ok(from)
    }

    /// Move to `to` only if the current state is `from`.
    pub fn transition_from(&self, from: LifecycleState, to: LifecycleState) -> Result<(), InvalidTransition> {
        {
            let mut inner = self.lock();
            if inner.state != from || !from.can_transition_to(to) {
                return Err(InvalidTransition { from: inner.state, to });
            }
            inner.state = to;
        }
        self.changed.notify_all();
        tracing::info!(%from, %to, "lifecycle transition");
        self.emit(LifecycleChange::Transitioned { from, to });
        Ok(())
    }

    pub fn record_error(&self, error: impl Into<String>) {
        self.lock().last_error = Some(error.into());
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn record_create_failure(&self, attempt: u32, error: String, will_retry: bool) {
        if !will_retry {
            self.record_error(error.clone());
        }
        self.emit(LifecycleChange::CreateAttemptFailed {
            attempt,
            error,
            will_retry,
        });
    }

    pub fn set_window(&self, window: Option<WindowHandle>) {
        self.lock().window = window;
        self.changed.notify_all();
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.lock().window
    }

    /// Flag the session as shutting down and wake every waiter.
    ///
    /// Returns true for the first request only.
    pub fn request_shutdown(&self) -> bool {
        let first = {
            let mut inner = self.lock();
            !std::mem::replace(&mut inner.shutdown_requested, true)
        };
        self.changed.notify_all();
        if first {
            self.emit(LifecycleChange::ShutdownRequested);
        }
        first
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.lock().shutdown_requested
    }

    /// Mark teardown complete and release shutdown waiters.
    pub fn mark_finished(&self) {
        self.lock().finished = true;
        self.changed.notify_all();
        self.emit(LifecycleChange::Finished);
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Block until teardown has completed.
    pub fn wait_finished(&self) {
        let guard = self.lock();
        let _guard = self
            .changed
            .wait_while(guard, |inner| !inner.finished)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
    }

    /// Block until the host bootstrap finished (either way) or shutdown began.
    ///
    /// Returns the state observed on wake-up.
    pub fn wait_for_start(&self, timeout: Duration) -> LifecycleState {
        let guard = self.lock();
        let (inner, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |inner| {
                matches!(inner.state, LifecycleState::NotStarted | LifecycleState::Starting)
                    && !inner.shutdown_requested
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.state
    }

    /// Block until the window is ready, shutdown begins, or `timeout` expires.
    pub fn wait_for_window_ready(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (inner, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |inner| {
                inner.state != LifecycleState::WindowReady && !inner.shutdown_requested
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.state == LifecycleState::WindowReady && !inner.shutdown_requested
    }

    /// Block while a window request is outstanding.
    ///
    /// Returns the state observed on wake-up: `WindowReady` on success,
    /// `AppReady` once creation gave up, still `WindowPending` on timeout.
    pub fn wait_for_window_outcome(&self, timeout: Duration) -> LifecycleState {
        let guard = self.lock();
        let (inner, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |inner| {
                inner.state == LifecycleState::WindowPending && !inner.shutdown_requested
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.state
    }

    pub fn is_window_ready(&self) -> bool {
        let inner = self.lock();
        inner.state == LifecycleState::WindowReady && !inner.shutdown_requested
    }

    /// Diagnostic snapshot; the overflow count comes from the event ring.
    pub fn snapshot(&self, overflow_count: u64) -> RuntimeState {
        let inner = self.lock();
        RuntimeState {
            state: inner.state,
            window_ready: inner.state == LifecycleState::WindowReady && !inner.shutdown_requested,
            shutdown_requested: inner.shutdown_requested,
            overflow_count,
            last_error: inner.last_error.clone(),
        }
    }

    /// Subscribe to lifecycle change events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleChange> {
        self.change_tx.subscribe()
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LifecycleManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            changed: Arc::clone(&self.changed),
            change_tx: self.change_tx.clone(),
        }
    }
}
