use crate::services::callbacks::ResizeHandler;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Quiet-period filter in front of a resize handler.
///
/// Every call records the size as "latest" and re-arms a one-shot timer on
/// the given tokio runtime. When the timer elapses without another call, the
/// wrapped handler receives the latest size. A zero quiet period forwards
/// synchronously.
///
/// After [`cancel`](Self::cancel) returns, the wrapped handler is never called
/// again, not even by a timer that was already sleeping.
#[derive(Clone)]
pub struct ResizeDebouncer {
    inner: Arc<Inner>,
}

struct Inner {
    handler: ResizeHandler,
    quiet: Duration,
    runtime: Handle,
    state: Mutex<DebounceState>,
    /// Held for the whole duration of a timer-driven handler call.
    fire_lock: Mutex<()>,
    firing_thread: Mutex<Option<ThreadId>>,
}

#[derive(Default)]
struct DebounceState {
    latest: Option<(u32, u32)>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    cancelled: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ResizeDebouncer {
    pub fn new(handler: ResizeHandler, quiet: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                handler,
                quiet,
                runtime,
                state: Mutex::new(DebounceState::default()),
                fire_lock: Mutex::new(()),
                firing_thread: Mutex::new(None),
            }),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.inner.quiet
    }

    /// The debounced handler, ready to be stored in a callback slot.
    pub fn handler(&self) -> ResizeHandler {
        let debouncer = self.clone();
        Arc::new(move |width, height| debouncer.call(width, height))
    }

    /// Record a size and (re)arm the timer.
    pub fn call(&self, width: u32, height: u32) {
        if self.inner.quiet.is_zero() {
            if lock(&self.inner.state).cancelled {
                return;
            }
            (self.inner.handler)(width, height);
            return;
        }

        let mut state = lock(&self.inner.state);
        if state.cancelled {
            return;
        }
        state.latest = Some((width, height));
        state.generation = state.generation.wrapping_add(1);
        if let Some(previous) = state.pending.take() {
            previous.abort();
        }

        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        let quiet = self.inner.quiet;
        state.pending = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(quiet).await;
            inner.fire(generation);
        }));
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        lock(&self.inner.state)
            .pending
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop all future deliveries without blocking.
    ///
    /// A delivery that is already running is left to finish; use
    /// [`wait_idle`](Self::wait_idle) to wait for it.
    pub fn disarm(&self) {
        let mut state = lock(&self.inner.state);
        state.cancelled = true;
        state.latest = None;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }

    /// Block until no delivery is running. Returns at once when called from
    /// inside the wrapped handler.
    pub fn wait_idle(&self) {
        if *lock(&self.inner.firing_thread) == Some(thread::current().id()) {
            return;
        }
        drop(lock(&self.inner.fire_lock));
    }

    /// [`disarm`](Self::disarm), then [`wait_idle`](Self::wait_idle).
    pub fn cancel(&self) {
        self.disarm();
        self.wait_idle();
    }

    pub fn is_cancelled(&self) -> bool {
        lock(&self.inner.state).cancelled
    }
}

impl Inner {
    fn fire(&self, generation: u64) {
        let _firing = lock(&self.fire_lock);
        let size = {
            let mut state = lock(&self.state);
            if state.cancelled || state.generation != generation {
                return;
            }
            state.pending = None;
            state.latest.take()
        };
        let Some((width, height)) = size else {
            return;
        };

        tracing::debug!(width, height, "debounced resize delivered");
        *lock(&self.firing_thread) = Some(thread::current().id());
        (self.handler)(width, height);
        *lock(&self.firing_thread) = None;
    }
}
