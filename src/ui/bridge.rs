// UiDispatcher - Marshals work from caller threads onto the UI-owning thread
//
// The UI-owning thread runs the native host's pump loop. Between pumps it
// drains a tokio channel of boxed tasks, so any thread can get code executed
// next to the native resources it must not touch directly.
//
// The dispatcher provides:
// - Fire-and-forget execution via post()
// - Await-completion execution via invoke() / invoke_async() through a one-shot slot
// - A waker kick after every post so a blocked pump returns promptly

use crate::ui::host::{EventLoopWaker, HostSink, NativeHost};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Work item executed on the UI-owning thread
pub type UiTask = Box<dyn FnOnce(&mut UiContext<'_>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The UI-owning thread has exited
    #[error("UI thread is no longer accepting work")]
    Closed,

    /// The task was discarded before it produced a result
    #[error("UI task dropped before completing")]
    Dropped,

    /// A blocking invoke was issued from the UI-owning thread itself
    #[error("blocking invoke from the UI thread would deadlock")]
    WouldDeadlock,
}

/// What a task sees while it runs on the UI-owning thread
pub struct UiContext<'a> {
    host: &'a mut dyn NativeHost,
    sink: &'a HostSink,
    exit_requested: bool,
}

impl<'a> UiContext<'a> {
    pub(crate) fn new(host: &'a mut dyn NativeHost, sink: &'a HostSink) -> Self {
        Self {
            host,
            sink,
            exit_requested: false,
        }
    }

    pub fn host(&mut self) -> &mut dyn NativeHost {
        &mut *self.host
    }

    pub fn sink(&self) -> &HostSink {
        self.sink
    }

    /// Ask the host to stop and leave the run loop after this task.
    pub fn request_exit(&mut self) {
        if !self.exit_requested {
            self.host.request_exit();
            self.exit_requested = true;
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// Cloneable handle for marshaling work onto the UI-owning thread
///
/// # Example
/// ```ignore
/// let dispatcher = controller.dispatcher()?;
///
/// // Fire and forget
/// dispatcher.post(|ctx| ctx.host().release_resources())?;
///
/// // Block until the UI thread has produced a value
/// let handle = dispatcher.invoke(|ctx| ctx.host().create_window(&spec))??;
/// ```
#[derive(Clone)]
pub struct UiDispatcher {
    task_tx: mpsc::UnboundedSender<UiTask>,
    waker: Arc<dyn EventLoopWaker>,
    ui_thread: Arc<OnceLock<ThreadId>>,
}

impl UiDispatcher {
    /// Create a dispatcher and the receiving end the UI thread drains
    pub(crate) fn channel(waker: Arc<dyn EventLoopWaker>) -> (Self, mpsc::UnboundedReceiver<UiTask>) {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            task_tx,
            waker,
            ui_thread: Arc::new(OnceLock::new()),
        };
        (dispatcher, task_rx)
    }

    pub(crate) fn bind_thread(&self, id: ThreadId) {
        let _ = self.ui_thread.set(id);
    }

    /// Whether the calling thread is the UI-owning thread
    pub fn is_ui_thread(&self) -> bool {
        self.ui_thread.get() == Some(&thread::current().id())
    }

    /// Queue `task` for the UI thread and return immediately
    pub fn post<F>(&self, task: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut UiContext<'_>) + Send + 'static,
    {
        self.task_tx
            .send(Box::new(task))
            .map_err(|_| DispatchError::Closed)?;

        if let Err(e) = self.waker.wake() {
            tracing::warn!("Failed to wake UI thread after post: {}", e);
        }
        Ok(())
    }

    /// Run `task` on the UI thread and block until it returns its value
    ///
    /// Safe to call from inside a tokio runtime; the result slot is a plain
    /// std channel.
    pub fn invoke<F, R>(&self, task: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut UiContext<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_ui_thread() {
            return Err(DispatchError::WouldDeadlock);
        }

        let (result_tx, result_rx) = std::sync::mpsc::sync_channel(1);
        self.post(move |ctx| {
            let _ = result_tx.send(task(ctx));
        })?;
        result_rx.recv().map_err(|_| DispatchError::Dropped)
    }

    /// Async flavour of [`invoke`](Self::invoke)
    pub async fn invoke_async<F, R>(&self, task: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut UiContext<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        self.post(move |ctx| {
            let _ = result_tx.send(task(ctx));
        })?;
        result_rx.await.map_err(|_| DispatchError::Dropped)
    }
}

/// Hooks the UI-owning thread reports its progress through
pub(crate) trait UiThreadObserver: Send + Sync + 'static {
    fn host_started(&self);
    fn host_failed(&self, error: crate::ui::host::HostError);
}

/// Clears the running flag when the UI thread exits, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Spawn the UI-owning thread.
///
/// The thread bootstraps the host, then alternates between draining queued
/// tasks and pumping the host until a task requests exit or every
/// dispatcher handle is gone.
pub(crate) fn spawn_ui_thread<O: UiThreadObserver>(
    mut host: Box<dyn NativeHost>,
    mut task_rx: mpsc::UnboundedReceiver<UiTask>,
    sink: HostSink,
    observer: Arc<O>,
    running: Arc<AtomicBool>,
    pump_interval: Duration,
) -> std::io::Result<JoinHandle<()>> {
    running.store(true, Ordering::Release);
    let guard_flag = running.clone();

    let spawned = thread::Builder::new().name("ui-owner".to_string()).spawn(move || {
        let _running = RunningGuard(guard_flag);
        tracing::debug!("UI thread started");

        if let Err(e) = host.start() {
            tracing::error!("Native host failed to start: {}", e);
            observer.host_failed(e);
            return;
        }
        observer.host_started();

        'outer: loop {
            loop {
                match task_rx.try_recv() {
                    Ok(task) => {
                        let mut ctx = UiContext::new(host.as_mut(), &sink);
                        task(&mut ctx);
                        if ctx.exit_requested() {
                            break 'outer;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        tracing::debug!("All dispatcher handles dropped");
                        break 'outer;
                    }
                }
            }
            host.pump(&sink, pump_interval);
        }

        tracing::debug!("UI thread terminated");
    });

    if spawned.is_err() {
        running.store(false, Ordering::Release);
    }
    spawned
}
