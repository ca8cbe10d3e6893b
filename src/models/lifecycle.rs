use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a session in its start/ready/shutdown progression.
///
/// Progression is forward-only except for the creation retry loop
/// (`WindowPending -> WindowPending`), a failed creation falling back to
/// `AppReady`, and `ShuttingDown` which is reachable from every live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    NotStarted,
    Starting,
    /// Host bootstrap failed; the error is recorded and no window will exist.
    Failed,
    AppReady,
    WindowPending,
    WindowReady,
    ShuttingDown,
    Shutdown,
}

impl LifecycleState {
    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, to) {
            (NotStarted, Starting) => true,
            (Starting, AppReady) | (Starting, Failed) => true,
            (AppReady, WindowPending) => true,
            (WindowPending, WindowPending) | (WindowPending, WindowReady) => true,
            (WindowPending, AppReady) => true,
            (ShuttingDown, Shutdown) => true,
            (Shutdown, _) | (ShuttingDown, _) => false,
            (_, ShuttingDown) => true,
            _ => false,
        }
    }

    /// True once the host bootstrap handshake has completed successfully.
    pub fn is_app_ready(self) -> bool {
        matches!(
            self,
            LifecycleState::AppReady | LifecycleState::WindowPending | LifecycleState::WindowReady
        )
    }

    pub fn is_terminating(self) -> bool {
        matches!(self, LifecycleState::ShuttingDown | LifecycleState::Shutdown)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::NotStarted => "not-started",
            LifecycleState::Starting => "starting",
            LifecycleState::Failed => "failed",
            LifecycleState::AppReady => "app-ready",
            LifecycleState::WindowPending => "window-pending",
            LifecycleState::WindowReady => "window-ready",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Diagnostic snapshot of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeState {
    pub state: LifecycleState,
    pub window_ready: bool,
    pub shutdown_requested: bool,
    pub overflow_count: u64,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::*;

    #[test]
    fn test_forward_transitions() {
        assert!(NotStarted.can_transition_to(Starting));
        assert!(Starting.can_transition_to(AppReady));
        assert!(Starting.can_transition_to(Failed));
        assert!(AppReady.can_transition_to(WindowPending));
        assert!(WindowPending.can_transition_to(WindowReady));
    }

    #[test]
    fn test_retry_loop_and_fallback() {
        assert!(WindowPending.can_transition_to(WindowPending));
        assert!(WindowPending.can_transition_to(AppReady));
        assert!(!WindowReady.can_transition_to(WindowPending));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!AppReady.can_transition_to(Starting));
        assert!(!WindowReady.can_transition_to(AppReady));
        assert!(!Starting.can_transition_to(NotStarted));
    }

    #[test]
    fn test_shutdown_reachable_from_every_live_state() {
        for state in [NotStarted, Starting, Failed, AppReady, WindowPending, WindowReady] {
            assert!(state.can_transition_to(ShuttingDown), "{state} -> shutting-down");
        }
        assert!(ShuttingDown.can_transition_to(Shutdown));
        assert!(!Shutdown.can_transition_to(ShuttingDown));
        assert!(!ShuttingDown.can_transition_to(ShuttingDown));
    }
}
