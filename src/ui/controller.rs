// Window Lifecycle Controller - Owns the session that bridges the UI thread and callers
//
// This module contains the WindowLifecycleController which coordinates:
// - The UI-owning thread (NativeHost + UiDispatcher)
// - RingEventQueue / InputStateTracker (fed by the host through HostSink)
// - CallbackRegistry / ResizeDebouncer (direct notification delivery)
// - LifecycleManager (start, readiness and shutdown state)
//
// It handles:
// - Idempotent start and the blocking init handshake
// - Bounded-retry window creation with linear backoff
// - Readiness waits
// - The watchdog-guarded, run-exactly-once shutdown sequence

use crate::metrics::BridgeMetrics;
use crate::models::{
    BridgeConfig, Event, KeyCode, LifecycleState, Modifiers, MouseButton, RawInput, RuntimeState, WindowHandle,
    WindowSpec, round_size,
};
use crate::services::{
    Callback, CallbackRegistry, CallbackSlot, CharTranslator, InputStateTracker, ResizeDebouncer, ResizeHandler,
    RingEventQueue, UsLayoutTranslator,
};
use crate::state::{LifecycleChange, LifecycleManager};
use crate::ui::bridge::{DispatchError, UiContext, UiDispatcher, UiThreadObserver, spawn_ui_thread};
use crate::ui::host::{CreateOutcome, HostError, HostSink, NativeHost, RetryDecision, RetryPolicy, default_retry_policy};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::broadcast;

const TIMER_THREAD_NAME: &str = "bridge-timer";

/// Called when the watchdog deadline passes with the UI thread still alive
pub type Terminator = Arc<dyn Fn() + Send + Sync>;

/// Hard process exit, used unless a test injects something gentler.
pub fn process_exit_terminator() -> Terminator {
    Arc::new(|| std::process::exit(0))
}

/// Errors surfaced by the controller
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("native host failed to start: {0}")]
    StartFailed(#[source] HostError),

    #[error("session has already been shut down")]
    AlreadyShutDown,

    #[error("operation not allowed in lifecycle state {0}")]
    NotReady(LifecycleState),

    #[error("failed to spawn bridge thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("UI dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("window not ready after {0:?}")]
    WindowNotReady(Duration),

    #[error("window creation gave up; see runtime state for the last error")]
    WindowUnavailable,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything shared between the controller, the UI-owning thread, timer
/// tasks and the shutdown thread.
pub(crate) struct Session {
    config: BridgeConfig,
    queue: RingEventQueue,
    input: InputStateTracker,
    callbacks: CallbackRegistry,
    debouncer: Mutex<Option<ResizeDebouncer>>,
    lifecycle: LifecycleManager,
    metrics: Arc<BridgeMetrics>,
    resized: AtomicBool,

    host: Mutex<Option<Box<dyn NativeHost>>>,
    start_error: Mutex<Option<HostError>>,
    dispatcher: Mutex<Option<UiDispatcher>>,
    ui_thread: Mutex<Option<JoinHandle<()>>>,
    ui_running: Arc<AtomicBool>,

    timers: Mutex<Option<Runtime>>,
    timer_handle: Handle,

    retry_policy: RetryPolicy,
    terminator: Terminator,

    started: AtomicBool,
    /// Serializes start against the beginning of teardown.
    start_lock: Mutex<()>,
    async_shutdown_started: AtomicBool,
    watchdog_started: AtomicBool,
    close_fired: AtomicBool,
    teardown_thread: Mutex<Option<ThreadId>>,
}

impl UiThreadObserver for Session {
    fn host_started(&self) {
        if let Err(e) = self.lifecycle.transition_from(LifecycleState::Starting, LifecycleState::AppReady) {
            tracing::debug!("Host started but lifecycle already moved on: {}", e);
        }
    }

    fn host_failed(&self, error: HostError) {
        self.lifecycle.record_error(error.to_string());
        *lock(&self.start_error) = Some(error);
        if let Err(e) = self.lifecycle.transition_from(LifecycleState::Starting, LifecycleState::Failed) {
            tracing::debug!("Host failure after lifecycle moved on: {}", e);
        }
    }
}

impl Session {
    // ---- UI-thread notification path -------------------------------------

    pub(crate) fn handle_input(&self, input: RawInput) {
        self.input.on_raw_input(&input);

        let event = input.to_event();
        self.queue.push(event);
        self.metrics.record_enqueued();
        match event {
            Event::Key { .. } => self.metrics.record_key(),
            _ => self.metrics.record_mouse(),
        }

        if self.callbacks.invoke_input(&event) {
            self.metrics.record_callback();
        }
    }

    pub(crate) fn handle_resize(&self, width: f64, height: f64) {
        self.queue.push(Event::Resize { width, height });
        self.metrics.record_enqueued();
        self.metrics.record_resize();
        self.resized.store(true, Ordering::Release);

        let (width, height) = round_size(width, height);
        if self.callbacks.invoke_resize(width, height) {
            self.metrics.record_callback();
        }
    }

    pub(crate) fn handle_window_created(&self, handle: WindowHandle) {
        if self.lifecycle.is_shutdown_requested() {
            tracing::debug!("Window {:?} created after shutdown began; ignoring", handle);
            return;
        }
        self.lifecycle.set_window(Some(handle));
        match self
            .lifecycle
            .transition_from(LifecycleState::WindowPending, LifecycleState::WindowReady)
        {
            Ok(()) => {
                tracing::info!("Main window {:?} ready", handle);
                self.queue.push(Event::Created);
                self.metrics.record_enqueued();
            }
            Err(e) => tracing::warn!("Unexpected window creation report: {}", e),
        }
    }

    pub(crate) fn handle_closed(self: &Arc<Self>) {
        tracing::info!("Host reported main window closed");
        self.queue.push(Event::Closed);
        self.metrics.record_enqueued();
        self.lifecycle.set_window(None);
        self.begin_shutdown_async();
    }

    // ---- start ------------------------------------------------------------

    fn start(self: &Arc<Self>) -> Result<(), BridgeError> {
        let _starting = lock(&self.start_lock);
        if self.lifecycle.is_shutdown_requested() {
            return Err(BridgeError::AlreadyShutDown);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let host = lock(&self.host).take().ok_or(BridgeError::AlreadyShutDown)?;
        if let Err(e) = self.lifecycle.transition(LifecycleState::Starting) {
            tracing::warn!("Start raced with shutdown: {}", e);
            return Err(BridgeError::AlreadyShutDown);
        }
        tracing::info!("Starting UI-owning thread");

        let (dispatcher, task_rx) = UiDispatcher::channel(host.waker());
        *lock(&self.dispatcher) = Some(dispatcher.clone());

        let spawned = spawn_ui_thread(
            host,
            task_rx,
            HostSink::new(Arc::clone(self)),
            Arc::clone(self),
            Arc::clone(&self.ui_running),
            self.config.pump_interval(),
        );
        match spawned {
            Ok(handle) => {
                dispatcher.bind_thread(handle.thread().id());
                *lock(&self.ui_thread) = Some(handle);
            }
            Err(e) => {
                tracing::error!("Failed to spawn UI thread: {}", e);
                lock(&self.dispatcher).take();
                self.lifecycle.record_error(e.to_string());
                let _ = self.lifecycle.transition(LifecycleState::Failed);
                return Err(BridgeError::ThreadSpawn(e));
            }
        }

        if self.config.create_window_on_start {
            self.spawn_create_on_ready(self.config.window.clone());
        }
        Ok(())
    }

    /// Request the configured window as soon as the host reports ready.
    fn spawn_create_on_ready(self: &Arc<Self>, spec: WindowSpec) {
        let session = Arc::clone(self);
        let timeout = self.config.ready_timeout();
        let spawned = thread::Builder::new()
            .name("bridge-autocreate".to_string())
            .spawn(move || {
                if session.lifecycle.wait_for_start(timeout) != LifecycleState::AppReady {
                    return;
                }
                if let Err(e) = session.request_window(spec) {
                    tracing::warn!("Automatic window creation not scheduled: {}", e);
                }
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn automatic window creation: {}", e);
        }
    }

    fn init(self: &Arc<Self>) -> Result<(), BridgeError> {
        self.start()?;
        let state = self.lifecycle.wait_for_start(self.config.ready_timeout());
        match state {
            s if s.is_app_ready() => Ok(()),
            LifecycleState::Failed => match lock(&self.start_error).clone() {
                Some(error) => Err(BridgeError::StartFailed(error)),
                None => Err(BridgeError::NotReady(LifecycleState::Failed)),
            },
            s if s.is_terminating() => Err(BridgeError::AlreadyShutDown),
            other => Err(BridgeError::NotReady(other)),
        }
    }

    // ---- window creation --------------------------------------------------

    fn request_window(self: &Arc<Self>, spec: WindowSpec) -> Result<(), BridgeError> {
        if self.lifecycle.is_shutdown_requested() {
            return Err(BridgeError::AlreadyShutDown);
        }
        self.lifecycle
            .transition_from(LifecycleState::AppReady, LifecycleState::WindowPending)
            .map_err(|e| BridgeError::NotReady(e.from))?;

        tracing::info!("Requesting main window {}x{} '{}'", spec.width, spec.height, spec.title);
        self.schedule_create(spec, 0);
        Ok(())
    }

    fn schedule_create(self: &Arc<Self>, spec: WindowSpec, attempt: u32) {
        let delay = self.config.create_backoff(attempt);
        let session = Arc::clone(self);
        self.timer_handle.spawn(async move {
            tokio::time::sleep(delay).await;
            session.post_create(spec, attempt);
        });
    }

    fn post_create(self: &Arc<Self>, spec: WindowSpec, attempt: u32) {
        if self.lifecycle.is_shutdown_requested() {
            return;
        }
        let Some(dispatcher) = lock(&self.dispatcher).clone() else {
            return;
        };

        let session = Arc::clone(self);
        if let Err(e) = dispatcher.post(move |ctx| session.attempt_create(ctx, spec, attempt)) {
            tracing::warn!("Could not schedule window creation attempt {}: {}", attempt, e);
            let _ = self
                .lifecycle
                .transition_from(LifecycleState::WindowPending, LifecycleState::AppReady);
        }
    }

    fn attempt_create(self: &Arc<Self>, ctx: &mut UiContext<'_>, spec: WindowSpec, attempt: u32) {
        if self.lifecycle.is_shutdown_requested() {
            return;
        }
        self.metrics.record_create_attempt();

        let error = match ctx.host().create_window(&spec) {
            Ok(CreateOutcome::Created(handle)) => {
                self.handle_window_created(handle);
                return;
            }
            Ok(CreateOutcome::Pending) => {
                tracing::debug!("Window creation attempt {} pending in host", attempt);
                return;
            }
            Err(error) => error,
        };

        let max_attempts = self.config.max_create_attempts;
        let retry = (self.retry_policy)(&error) == RetryDecision::Retry && attempt + 1 < max_attempts;
        self.lifecycle.record_create_failure(attempt, error.to_string(), retry);

        if retry {
            tracing::warn!(
                "Window creation attempt {}/{} failed ({}), retrying",
                attempt + 1,
                max_attempts,
                error
            );
            self.metrics.record_create_retry();
            let _ = self.lifecycle.transition(LifecycleState::WindowPending);
            self.schedule_create(spec, attempt + 1);
        } else {
            tracing::error!(
                "Window creation failed after {} attempt(s): {}",
                attempt + 1,
                error
            );
            let _ = self
                .lifecycle
                .transition_from(LifecycleState::WindowPending, LifecycleState::AppReady);
        }
    }

    // ---- handlers ---------------------------------------------------------

    fn register_resize_handler(&self, handler: ResizeHandler, debounce: Duration) {
        if self.lifecycle.is_shutdown_requested() {
            tracing::debug!("Ignoring resize handler registered during shutdown");
            return;
        }

        let previous = {
            let mut slot = lock(&self.debouncer);
            // The old timer must be dead before the new handler becomes visible
            let previous = slot.take();
            if let Some(previous) = &previous {
                previous.disarm();
            }
            if debounce.is_zero() {
                self.callbacks.register(Callback::Resize(handler));
            } else {
                let metrics = Arc::clone(&self.metrics);
                let counted: ResizeHandler = Arc::new(move |w: u32, h: u32| {
                    metrics.record_debounced_resize();
                    handler(w, h);
                });
                let debouncer = ResizeDebouncer::new(counted, debounce, self.timer_handle.clone());
                self.callbacks.register(Callback::Resize(debouncer.handler()));
                *slot = Some(debouncer);
            }
            previous
        };

        if let Some(previous) = previous {
            self.wait_debouncer_idle(&previous);
        }
    }

    fn unregister(&self, slot: CallbackSlot) {
        if slot != CallbackSlot::Resize {
            self.callbacks.unregister(slot);
            return;
        }
        let previous = self.disarm_debouncer();
        self.callbacks.unregister(slot);
        if let Some(previous) = previous {
            self.wait_debouncer_idle(&previous);
        }
    }

    /// Take the current debouncer out of its slot and stop its timer.
    fn disarm_debouncer(&self) -> Option<ResizeDebouncer> {
        let debouncer = lock(&self.debouncer).take();
        if let Some(debouncer) = &debouncer {
            debouncer.disarm();
        }
        debouncer
    }

    /// Wait out a delivery still running on the timer thread. Never blocks the UI thread.
    fn wait_debouncer_idle(&self, debouncer: &ResizeDebouncer) {
        if self.is_ui_thread() {
            return;
        }
        debouncer.wait_idle();
    }

    // ---- shutdown ---------------------------------------------------------

    fn is_ui_thread(&self) -> bool {
        lock(&self.dispatcher)
            .as_ref()
            .is_some_and(|dispatcher| dispatcher.is_ui_thread())
    }

    fn begin_shutdown_async(self: &Arc<Self>) {
        if self.lifecycle.is_finished() || self.async_shutdown_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let session = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("bridge-shutdown".to_string())
            .spawn(move || session.shutdown());
        if let Err(e) = spawned {
            tracing::error!("Failed to spawn shutdown thread: {}", e);
            self.async_shutdown_started.store(false, Ordering::Release);
        }
    }

    fn shutdown(self: &Arc<Self>) {
        self.metrics.record_shutdown_call();
        if self.lifecycle.is_finished() {
            return;
        }

        if self.is_ui_thread() {
            tracing::warn!("Shutdown called on the UI thread; continuing on a background thread");
            self.begin_shutdown_async();
            return;
        }

        if thread::current().name() == Some(TIMER_THREAD_NAME) {
            // Teardown waits for the debounced handler running on this thread
            tracing::debug!("Shutdown called from a timer task; continuing on a background thread");
            self.begin_shutdown_async();
            return;
        }

        if *lock(&self.teardown_thread) == Some(thread::current().id()) {
            // Re-entered from a handler dropped during teardown
            return;
        }

        if !self.lifecycle.request_shutdown() {
            tracing::debug!("Shutdown already in progress; waiting for it to finish");
            self.lifecycle.wait_finished();
            return;
        }

        self.teardown();
    }

    fn teardown(self: &Arc<Self>) {
        *lock(&self.teardown_thread) = Some(thread::current().id());
        drop(lock(&self.start_lock));
        let from = self.lifecycle.state();
        if let Err(e) = self.lifecycle.transition(LifecycleState::ShuttingDown) {
            tracing::debug!("Shutdown transition skipped: {}", e);
        }
        tracing::info!("Shutting down session (was {})", from);

        let close_handler = self.callbacks.take_close();
        let dispatcher = lock(&self.dispatcher).clone();

        // (a) cleanup and exit on the UI thread
        if let Some(dispatcher) = &dispatcher {
            let session = Arc::clone(self);
            if let Err(e) = dispatcher.post(move |ctx| session.ui_cleanup(ctx)) {
                tracing::debug!("UI thread not accepting cleanup: {}", e);
            }
        }

        // (b) watchdog
        if self.ui_running.load(Ordering::Acquire) {
            self.arm_watchdog();
        }

        // (c) join
        let ui_thread = lock(&self.ui_thread).take();
        if let Some(handle) = ui_thread {
            if handle.join().is_err() {
                tracing::warn!("UI thread panicked before shutdown completed");
            }
        }

        // (d) wipe shared state, after any in-flight resize delivery has returned
        if let Some(debouncer) = self.disarm_debouncer() {
            debouncer.wait_idle();
        }
        self.callbacks.clear_all();
        self.queue.clear();
        self.input.clear_all();
        self.resized.store(false, Ordering::Release);
        self.lifecycle.set_window(None);
        lock(&self.dispatcher).take();
        lock(&self.host).take();
        if let Some(runtime) = lock(&self.timers).take() {
            runtime.shutdown_background();
        }
        if let Err(e) = self.lifecycle.transition(LifecycleState::Shutdown) {
            tracing::debug!("Final transition skipped: {}", e);
        }

        // (e) close handler, once
        if let Some(handler) = close_handler {
            if !self.close_fired.swap(true, Ordering::AcqRel) {
                if panic::catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
                    tracing::warn!("Close handler panicked");
                }
                self.metrics.record_callback();
            }
        }

        // (f) finished
        self.metrics.sync_dropped(self.queue.overflow_count());
        self.lifecycle.mark_finished();
        tracing::info!("Session shutdown complete");
        self.metrics.log_summary();
    }

    /// Runs on the UI thread as the last queued task.
    fn ui_cleanup(&self, ctx: &mut UiContext<'_>) {
        tracing::debug!("Running UI-thread cleanup");
        if let Some(debouncer) = lock(&self.debouncer).as_ref() {
            debouncer.disarm();
        }
        self.callbacks.clear_all();
        ctx.host().release_resources();
        self.lifecycle.set_window(None);
        ctx.request_exit();
    }

    fn arm_watchdog(&self) {
        if self.watchdog_started.swap(true, Ordering::AcqRel) {
            return;
        }
        self.metrics.record_watchdog_arm();

        let running = Arc::clone(&self.ui_running);
        let terminator = Arc::clone(&self.terminator);
        let timeout = self.config.watchdog_timeout();
        let poll = self.config.watchdog_poll();

        let spawned = thread::Builder::new()
            .name("bridge-watchdog".to_string())
            .spawn(move || {
                let deadline = Instant::now() + timeout;
                loop {
                    if !running.load(Ordering::Acquire) {
                        tracing::debug!("UI thread exited; watchdog disarmed");
                        return;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::sleep(poll.min(deadline - now));
                }
                tracing::error!(
                    "UI thread still running {}ms after shutdown began; forcing process exit",
                    timeout.as_millis()
                );
                terminator();
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to arm shutdown watchdog: {}", e);
        }
    }
}

/// Builder for [`WindowLifecycleController`]
pub struct ControllerBuilder {
    host: Box<dyn NativeHost>,
    config: BridgeConfig,
    retry_policy: RetryPolicy,
    terminator: Terminator,
    translator: Arc<dyn CharTranslator>,
}

impl ControllerBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Replace the watchdog's hard process exit.
    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn translator(mut self, translator: Arc<dyn CharTranslator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn build(self) -> Result<WindowLifecycleController, BridgeError> {
        let config = self.config.validated();
        let timers = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(TIMER_THREAD_NAME)
            .enable_time()
            .build()?;
        let timer_handle = timers.handle().clone();

        let session = Session {
            queue: RingEventQueue::new(config.ring_capacity),
            input: InputStateTracker::with_translator(self.translator),
            callbacks: CallbackRegistry::new(),
            debouncer: Mutex::new(None),
            lifecycle: LifecycleManager::new(),
            metrics: Arc::new(BridgeMetrics::new()),
            resized: AtomicBool::new(false),
            host: Mutex::new(Some(self.host)),
            start_error: Mutex::new(None),
            dispatcher: Mutex::new(None),
            ui_thread: Mutex::new(None),
            ui_running: Arc::new(AtomicBool::new(false)),
            timers: Mutex::new(Some(timers)),
            timer_handle,
            retry_policy: self.retry_policy,
            terminator: self.terminator,
            started: AtomicBool::new(false),
            start_lock: Mutex::new(()),
            async_shutdown_started: AtomicBool::new(false),
            watchdog_started: AtomicBool::new(false),
            close_fired: AtomicBool::new(false),
            teardown_thread: Mutex::new(None),
            config,
        };

        Ok(WindowLifecycleController {
            session: Arc::new(session),
        })
    }
}

/// Process-wide session bridging one UI-owning thread to caller threads
///
/// Construct one per session (tests: one per test case). The UI-owning
/// thread is spawned by [`start`](Self::start) and torn down, exactly once, by
/// [`shutdown`](Self::shutdown). Dropping the controller shuts the session down.
///
/// # Example
/// ```ignore
/// let (host, injector) = HeadlessHost::new();
/// let controller = WindowLifecycleController::new(host, BridgeConfig::default())?;
/// controller.init()?;
/// controller.create_window_and_wait(WindowSpec::new(800, 600, "demo"), Duration::from_secs(2))?;
///
/// loop {
///     let (events, _more) = controller.poll_events(32);
///     // ...
///     controller.reset_frame_state();
/// }
/// ```
pub struct WindowLifecycleController {
    session: Arc<Session>,
}

impl WindowLifecycleController {
    pub fn builder(host: impl NativeHost) -> ControllerBuilder {
        ControllerBuilder {
            host: Box::new(host),
            config: BridgeConfig::default(),
            retry_policy: default_retry_policy(),
            terminator: process_exit_terminator(),
            translator: Arc::new(UsLayoutTranslator),
        }
    }

    pub fn new(host: impl NativeHost, config: BridgeConfig) -> Result<Self, BridgeError> {
        Self::builder(host).config(config).build()
    }

    // ---- lifecycle --------------------------------------------------------

    /// Spawn the UI-owning thread. Idempotent and non-blocking.
    pub fn start(&self) -> Result<(), BridgeError> {
        self.session.start()
    }

    /// Start, then block until the host bootstrap has succeeded or failed.
    pub fn init(&self) -> Result<(), BridgeError> {
        self.session.init()
    }

    /// Schedule creation of the main window. Requires the app to be ready
    /// and no window to exist or be pending.
    pub fn request_window(&self, spec: WindowSpec) -> Result<(), BridgeError> {
        self.session.request_window(spec)
    }

    /// Block until the window is ready. A zero timeout uses the configured default.
    pub fn wait_for_window_ready(&self, timeout: Duration) -> bool {
        let timeout = if timeout.is_zero() {
            self.session.config.ready_timeout()
        } else {
            timeout
        };
        self.session.lifecycle.wait_for_window_ready(timeout)
    }

    pub fn create_window_and_wait(&self, spec: WindowSpec, timeout: Duration) -> Result<WindowHandle, BridgeError> {
        let timeout = if timeout.is_zero() {
            self.session.config.ready_timeout()
        } else {
            timeout
        };
        self.request_window(spec)?;

        let state = self.session.lifecycle.wait_for_window_outcome(timeout);
        if self.session.lifecycle.is_shutdown_requested() {
            return Err(BridgeError::AlreadyShutDown);
        }
        match state {
            LifecycleState::WindowReady => self.session.lifecycle.window().ok_or(BridgeError::WindowUnavailable),
            LifecycleState::AppReady => Err(BridgeError::WindowUnavailable),
            _ => Err(BridgeError::WindowNotReady(timeout)),
        }
    }

    /// Tear the session down. Blocks until teardown is complete; safe to
    /// call repeatedly and from many threads at once.
    pub fn shutdown(&self) {
        self.session.shutdown();
    }

    /// Start the shutdown sequence on a background thread and return at once.
    pub fn begin_shutdown_async(&self) {
        self.session.begin_shutdown_async();
    }

    pub fn state(&self) -> LifecycleState {
        self.session.lifecycle.state()
    }

    pub fn runtime_state(&self) -> RuntimeState {
        self.session.lifecycle.snapshot(self.session.queue.overflow_count())
    }

    pub fn is_window_ready(&self) -> bool {
        self.session.lifecycle.is_window_ready()
    }

    pub fn main_window(&self) -> Option<WindowHandle> {
        self.session.lifecycle.window()
    }

    pub fn window_exists(&self) -> bool {
        self.main_window().is_some()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.session.lifecycle.is_shutdown_requested()
    }

    pub fn is_finished(&self) -> bool {
        self.session.lifecycle.is_finished()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleChange> {
        self.session.lifecycle.subscribe()
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.session.metrics
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.session.config
    }

    // ---- UI-thread marshaling ---------------------------------------------

    pub fn dispatcher(&self) -> Result<UiDispatcher, BridgeError> {
        lock(&self.session.dispatcher)
            .clone()
            .ok_or_else(|| BridgeError::NotReady(self.state()))
    }

    /// Run `task` on the UI thread without waiting for it.
    pub fn post<F>(&self, task: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&mut UiContext<'_>) + Send + 'static,
    {
        Ok(self.dispatcher()?.post(task)?)
    }

    /// Run `task` on the UI thread and wait for its result.
    pub fn invoke<F, R>(&self, task: F) -> Result<R, BridgeError>
    where
        F: FnOnce(&mut UiContext<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        Ok(self.dispatcher()?.invoke(task)?)
    }

    // ---- polling ----------------------------------------------------------

    pub fn poll_events(&self, max: usize) -> (Vec<Event>, bool) {
        let batch = self.session.queue.pop_batch(max);
        self.session.metrics.sync_dropped(self.session.queue.overflow_count());
        batch
    }

    /// Per-frame reset of input edges, input FIFOs and the resized flag.
    pub fn reset_frame_state(&self) {
        self.session.input.reset();
        self.session.resized.store(false, Ordering::Release);
    }

    pub fn is_window_resized(&self) -> bool {
        self.session.resized.load(Ordering::Acquire)
    }

    pub fn overflow_count(&self) -> u64 {
        self.session.queue.overflow_count()
    }

    // ---- handlers ---------------------------------------------------------

    /// Register the resize handler; a zero `debounce` delivers every notification.
    pub fn register_resize_handler<F>(&self, handler: F, debounce: Duration)
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        self.session.register_resize_handler(Arc::new(handler), debounce);
    }

    /// Register the resize handler with the configured quiet period.
    pub fn register_resize_handler_default<F>(&self, handler: F)
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        let debounce = self.session.config.resize_debounce();
        self.register_resize_handler(handler, debounce);
    }

    pub fn register_input_handler<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        if self.is_shutdown_requested() {
            return;
        }
        self.session.callbacks.register(Callback::Input(Arc::new(handler)));
    }

    pub fn register_close_handler<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_shutdown_requested() {
            return;
        }
        self.session.callbacks.register(Callback::Close(Arc::new(handler)));
    }

    pub fn unregister_handler(&self, slot: CallbackSlot) {
        self.session.unregister(slot);
    }

    // ---- input queries ----------------------------------------------------

    pub fn is_key_down(&self, code: KeyCode) -> bool {
        self.session.input.is_key_down(code)
    }

    pub fn is_key_up(&self, code: KeyCode) -> bool {
        self.session.input.is_key_up(code)
    }

    pub fn is_key_pressed(&self, code: KeyCode) -> bool {
        self.session.input.is_key_pressed(code)
    }

    pub fn is_key_released(&self, code: KeyCode) -> bool {
        self.session.input.is_key_released(code)
    }

    pub fn is_key_repeat(&self, code: KeyCode) -> bool {
        self.session.input.is_key_repeat(code)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.session.input.is_mouse_button_down(button)
    }

    pub fn is_mouse_button_up(&self, button: MouseButton) -> bool {
        self.session.input.is_mouse_button_up(button)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.session.input.is_mouse_button_pressed(button)
    }

    pub fn is_mouse_button_released(&self, button: MouseButton) -> bool {
        self.session.input.is_mouse_button_released(button)
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        self.session.input.mouse_position()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.session.input.modifiers()
    }

    pub fn dequeue_key_press(&self) -> Option<KeyCode> {
        self.session.input.dequeue_key()
    }

    pub fn dequeue_char(&self) -> Option<char> {
        self.session.input.dequeue_char()
    }
}

impl Drop for WindowLifecycleController {
    fn drop(&mut self) {
        self.session.shutdown();
        if let Some(runtime) = lock(&self.session.timers).take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::headless::HeadlessHost;
    use std::sync::atomic::AtomicUsize;

    fn fast_config() -> BridgeConfig {
        BridgeConfig {
            create_backoff_base_ms: 1,
            watchdog_timeout_ms: 500,
            watchdog_poll_ms: 10,
            pump_interval_ms: 5,
            ..BridgeConfig::default()
        }
    }

    fn test_controller() -> (WindowLifecycleController, crate::ui::headless::HeadlessInjector) {
        let (host, injector) = HeadlessHost::new();
        let controller = WindowLifecycleController::builder(host)
            .config(fast_config())
            .terminator(Arc::new(|| {}))
            .build()
            .unwrap();
        (controller, injector)
    }

    #[test]
    fn test_controller_creation() {
        let (controller, _injector) = test_controller();
        assert_eq!(controller.state(), LifecycleState::NotStarted);
        assert!(!controller.is_window_ready());
        assert!(controller.dispatcher().is_err());
    }

    #[test]
    fn test_start_is_idempotent() {
        let (controller, _injector) = test_controller();
        controller.start().unwrap();
        controller.start().unwrap();
        controller.init().unwrap();
        assert_eq!(controller.state(), LifecycleState::AppReady);
    }

    #[test]
    fn test_request_window_before_ready_is_rejected() {
        let (controller, _injector) = test_controller();
        let err = controller.request_window(WindowSpec::default()).unwrap_err();
        assert!(matches!(err, BridgeError::NotReady(LifecycleState::NotStarted)));
    }

    #[test]
    fn test_invoke_runs_on_ui_thread() {
        let (controller, _injector) = test_controller();
        controller.init().unwrap();

        let name = controller
            .invoke(|_| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("ui-owner"));
    }

    #[test]
    fn test_shutdown_without_start_fires_close_once() {
        let (controller, _injector) = test_controller();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        controller.register_close_handler(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        controller.shutdown();
        controller.shutdown();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), LifecycleState::Shutdown);
        assert!(matches!(controller.start(), Err(BridgeError::AlreadyShutDown)));
    }

    #[test]
    fn test_drop_without_start_fires_close() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let (controller, _injector) = test_controller();
            let f = fired.clone();
            controller.register_close_handler(move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_frame_state_clears_resized_flag() {
        let (controller, injector) = test_controller();
        controller.init().unwrap();
        controller
            .create_window_and_wait(WindowSpec::default(), Duration::from_secs(2))
            .unwrap();

        injector.resize(640.0, 480.0);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !controller.is_window_resized() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(controller.is_window_resized());

        controller.reset_frame_state();
        assert!(!controller.is_window_resized());
    }
}
