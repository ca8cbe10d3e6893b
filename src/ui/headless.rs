// Headless native host
//
// A NativeHost with no windowing system behind it. Raw notifications are fed
// in through a HeadlessInjector from any thread and replayed on the UI-owning
// thread during pump(), so they travel the exact path a real host would use.

use crate::models::{Action, Modifiers, RawInput, WindowHandle, WindowSpec};
use crate::ui::host::{CreateOutcome, EventLoopWaker, HostError, HostSink, NativeHost};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

enum HostCommand {
    Input(RawInput),
    RawInput {
        kind: u32,
        code_with_mods: u32,
        action: u32,
        packed_xy: u64,
    },
    Resize(f64, f64),
    ResizeBits(u64, u64),
    Close,
    CompleteCreate(WindowHandle),
    Wake,
}

/// Feeds notifications into a [`HeadlessHost`] from any thread
#[derive(Clone)]
pub struct HeadlessInjector {
    tx: Sender<HostCommand>,
    create_failures: Arc<Mutex<VecDeque<HostError>>>,
}

fn lock(failures: &Mutex<VecDeque<HostError>>) -> MutexGuard<'_, VecDeque<HostError>> {
    failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HeadlessInjector {
    fn send(&self, command: HostCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!("Headless host is gone; notification dropped");
        }
    }

    pub fn input(&self, input: RawInput) {
        self.send(HostCommand::Input(input));
    }

    pub fn key(&self, code: u16, action: Action, modifiers: Modifiers) {
        self.input(RawInput::key(code, action, modifiers));
    }

    pub fn mouse(&self, button: u16, action: Action, modifiers: Modifiers, x: i32, y: i32) {
        self.input(RawInput::mouse(button, action, modifiers, x, y));
    }

    /// Deliver through the packed native form.
    pub fn raw(&self, kind: u32, code_with_mods: u32, action: u32, packed_xy: u64) {
        self.send(HostCommand::RawInput {
            kind,
            code_with_mods,
            action,
            packed_xy,
        });
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.send(HostCommand::Resize(width, height));
    }

    pub fn resize_bits(&self, width: f64, height: f64) {
        self.send(HostCommand::ResizeBits(width.to_bits(), height.to_bits()));
    }

    /// Simulate the user closing the main window.
    pub fn close(&self) {
        self.send(HostCommand::Close);
    }

    /// Make the next window creation attempt fail with `error`.
    pub fn fail_next_create(&self, error: HostError) {
        lock(&self.create_failures).push_back(error);
    }
}

struct HeadlessWaker {
    tx: Sender<HostCommand>,
}

impl EventLoopWaker for HeadlessWaker {
    fn wake(&self) -> Result<(), HostError> {
        self.tx
            .send(HostCommand::Wake)
            .map_err(|_| HostError::Unavailable("headless host dropped".to_string()))
    }
}

/// In-process [`NativeHost`] used by tests and the demo binary
pub struct HeadlessHost {
    rx: Receiver<HostCommand>,
    tx: Sender<HostCommand>,
    start_error: Option<HostError>,
    create_failures: Arc<Mutex<VecDeque<HostError>>>,
    deferred_creation: bool,
    exit_delay: Duration,
    next_handle: u64,
    window: Option<WindowHandle>,
}

impl HeadlessHost {
    pub fn new() -> (Self, HeadlessInjector) {
        let (tx, rx) = mpsc::channel();
        let create_failures = Arc::new(Mutex::new(VecDeque::new()));
        let host = Self {
            rx,
            tx: tx.clone(),
            start_error: None,
            create_failures: Arc::clone(&create_failures),
            deferred_creation: false,
            exit_delay: Duration::ZERO,
            next_handle: 1,
            window: None,
        };
        (host, HeadlessInjector { tx, create_failures })
    }

    /// Make `start` fail with `error`.
    pub fn with_start_error(mut self, error: HostError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Queue errors returned by successive creation attempts.
    pub fn with_create_failures(self, failures: impl IntoIterator<Item = HostError>) -> Self {
        lock(&self.create_failures).extend(failures);
        self
    }

    /// Report creation as pending and complete it on the next pump.
    pub fn with_deferred_creation(mut self) -> Self {
        self.deferred_creation = true;
        self
    }

    /// Block inside `request_exit` for `delay`, like a native exit sequence that hangs.
    pub fn with_exit_delay(mut self, delay: Duration) -> Self {
        self.exit_delay = delay;
        self
    }

    fn apply(&mut self, command: HostCommand, sink: &HostSink) {
        match command {
            HostCommand::Input(input) => sink.on_input(input),
            HostCommand::RawInput {
                kind,
                code_with_mods,
                action,
                packed_xy,
            } => sink.on_raw_input(kind, code_with_mods, action, packed_xy),
            HostCommand::Resize(width, height) => sink.on_resize(width, height),
            HostCommand::ResizeBits(width, height) => sink.on_resize_bits(width, height),
            HostCommand::Close => match self.window.take() {
                Some(_) => sink.on_closed(),
                None => tracing::debug!("Close requested with no window; ignoring"),
            },
            HostCommand::CompleteCreate(handle) => {
                self.window = Some(handle);
                sink.on_window_created(handle);
            }
            HostCommand::Wake => {}
        }
    }
}

impl NativeHost for HeadlessHost {
    fn start(&mut self) -> Result<(), HostError> {
        match self.start_error.take() {
            Some(error) => Err(error),
            None => {
                tracing::debug!("Headless host started");
                Ok(())
            }
        }
    }

    fn create_window(&mut self, spec: &WindowSpec) -> Result<CreateOutcome, HostError> {
        if let Some(error) = lock(&self.create_failures).pop_front() {
            return Err(error);
        }

        let handle = WindowHandle(self.next_handle);
        self.next_handle += 1;
        tracing::debug!("Headless window {:?} {}x{} '{}'", handle, spec.width, spec.height, spec.title);

        if self.deferred_creation {
            let _ = self.tx.send(HostCommand::CompleteCreate(handle));
            return Ok(CreateOutcome::Pending);
        }
        self.window = Some(handle);
        Ok(CreateOutcome::Created(handle))
    }

    fn pump(&mut self, sink: &HostSink, max_wait: Duration) {
        match self.rx.recv_timeout(max_wait) {
            Ok(command) => self.apply(command, sink),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return,
        }
        while let Ok(command) = self.rx.try_recv() {
            self.apply(command, sink);
        }
    }

    fn request_exit(&mut self) {
        if !self.exit_delay.is_zero() {
            tracing::debug!("Headless host exiting slowly ({:?})", self.exit_delay);
            std::thread::sleep(self.exit_delay);
        }
        self.window = None;
    }

    fn release_resources(&mut self) {
        self.window = None;
    }

    fn waker(&self) -> Arc<dyn EventLoopWaker> {
        Arc::new(HeadlessWaker { tx: self.tx.clone() })
    }
}
