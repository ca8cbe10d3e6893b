// Native host seam
//
// The native UI host owns the real event loop. The bridge only talks to it
// through the NativeHost trait (called on the UI-owning thread) and hands it a
// HostSink through which the host reports raw notifications back.

use crate::models::{RawInput, WindowHandle, WindowSpec, decode_resize_bits};
use crate::ui::controller::Session;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the native host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A dependency of the host is not ready yet; the operation may succeed later
    #[error("transient host error {code:#x}: {message}")]
    Transient { code: u32, message: String },

    #[error("fatal host error {code:#x}: {message}")]
    Fatal { code: u32, message: String },

    /// Operation on an unknown or already released handle
    #[error("native resource {0:?} not found")]
    NotFound(WindowHandle),

    #[error("host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    pub fn transient(code: u32, message: impl Into<String>) -> Self {
        Self::Transient {
            code,
            message: message.into(),
        }
    }

    pub fn fatal(code: u32, message: impl Into<String>) -> Self {
        Self::Fatal {
            code,
            message: message.into(),
        }
    }
}

/// What to do with a failed window creation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    FailFast,
}

/// Classifies creation errors into retry / fail-fast
pub type RetryPolicy = Arc<dyn Fn(&HostError) -> RetryDecision + Send + Sync>;

/// Retries transient errors only.
pub fn default_retry_policy() -> RetryPolicy {
    Arc::new(|error: &HostError| match error {
        HostError::Transient { .. } => RetryDecision::Retry,
        _ => RetryDecision::FailFast,
    })
}

/// Result of a window creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(WindowHandle),
    /// The host finishes creation later and reports it through
    /// [`HostSink::on_window_created`].
    Pending,
}

/// Wakes the UI-owning thread out of a blocking [`NativeHost::pump`].
pub trait EventLoopWaker: Send + Sync {
    fn wake(&self) -> Result<(), HostError>;
}

/// The native UI host collaborator.
///
/// Every method runs on the UI-owning thread. The host is moved onto that
/// thread when the session starts and dropped there when it exits.
pub trait NativeHost: Send + 'static {
    /// One-time bootstrap of the hosted application model.
    fn start(&mut self) -> Result<(), HostError>;

    fn create_window(&mut self, spec: &WindowSpec) -> Result<CreateOutcome, HostError>;

    /// Process native events for at most `max_wait`, reporting them to `sink`.
    ///
    /// Must return early when the waker fires.
    fn pump(&mut self, sink: &HostSink, max_wait: Duration);

    /// Ask the hosted application model to stop.
    fn request_exit(&mut self);

    /// Drop cached native resources (windows, controls) before exit.
    fn release_resources(&mut self) {}

    fn waker(&self) -> Arc<dyn EventLoopWaker>;
}

/// Entry point for raw notifications coming from the host.
///
/// Only the UI-owning thread should call these; they update input state,
/// push onto the event ring and run registered handlers synchronously.
#[derive(Clone)]
pub struct HostSink {
    session: Arc<Session>,
}

impl HostSink {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn on_input(&self, input: RawInput) {
        self.session.handle_input(input);
    }

    /// Narrow ABI form: `code_with_mods` low 16 bits code, high 16 bits
    /// modifiers; `packed_xy` low 32 bits x, high 32 bits y.
    pub fn on_raw_input(&self, kind: u32, code_with_mods: u32, action: u32, packed_xy: u64) {
        match RawInput::unpack(kind, code_with_mods, action, packed_xy) {
            Some(input) => self.session.handle_input(input),
            None => tracing::trace!(kind, action, "unsupported raw input ignored"),
        }
    }

    pub fn on_resize(&self, width: f64, height: f64) {
        self.session.handle_resize(width, height);
    }

    /// Narrow ABI form: IEEE-754 bit patterns of the new size.
    pub fn on_resize_bits(&self, width_bits: u64, height_bits: u64) {
        let (width, height) = decode_resize_bits(width_bits, height_bits);
        self.session.handle_resize(width, height);
    }

    /// Completes a creation that returned [`CreateOutcome::Pending`].
    pub fn on_window_created(&self, handle: WindowHandle) {
        self.session.handle_window_created(handle);
    }

    /// The host's window was destroyed by the user or the system.
    pub fn on_closed(&self) {
        self.session.handle_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_retries_transient_only() {
        let policy = default_retry_policy();
        assert_eq!(policy(&HostError::transient(0x8000_4002, "E_NOINTERFACE")), RetryDecision::Retry);
        assert_eq!(policy(&HostError::fatal(1, "boom")), RetryDecision::FailFast);
        assert_eq!(policy(&HostError::NotFound(WindowHandle(3))), RetryDecision::FailFast);
        assert_eq!(policy(&HostError::Unavailable("gone".into())), RetryDecision::FailFast);
    }

    #[test]
    fn test_error_display() {
        let err = HostError::transient(0x8000_4002, "E_NOINTERFACE");
        assert_eq!(err.to_string(), "transient host error 0x80004002: E_NOINTERFACE");
    }
}
