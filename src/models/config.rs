use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration, loaded from `ui-bridge.yaml` and `UI_BRIDGE__*` variables.
///
/// Every field has a default so a partial (or missing) file is valid.
/// The retry and watchdog constants are tunable defaults, not protocol requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Slots in the event ring before the oldest unread event is overwritten.
    pub ring_capacity: usize,

    /// Upper bound on window creation attempts (first attempt included).
    pub max_create_attempts: u32,

    /// Linear backoff base: attempt `n` is delayed by `base * (n + 1)`.
    pub create_backoff_base_ms: u64,

    /// Deadline for the UI thread to exit once shutdown has begun.
    pub watchdog_timeout_ms: u64,

    pub watchdog_poll_ms: u64,

    /// Quiet period used by `register_resize_handler_default`.
    pub resize_debounce_ms: u64,

    /// Longest time the UI thread waits inside a single host pump.
    pub pump_interval_ms: u64,

    /// Readiness wait used when a caller passes a zero timeout.
    pub ready_timeout_ms: u64,

    /// Request the main window as soon as the host reports ready.
    pub create_window_on_start: bool,

    pub target_fps: u32,

    pub window: WindowSpec,

    pub logging: LoggingConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 256,
            max_create_attempts: 8,
            create_backoff_base_ms: 50,
            watchdog_timeout_ms: 2000,
            watchdog_poll_ms: 100,
            resize_debounce_ms: 200,
            pump_interval_ms: 16,
            ready_timeout_ms: 5000,
            create_window_on_start: false,
            target_fps: 60,
            window: WindowSpec::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Clamp values that would make the bridge unusable.
    pub fn validated(mut self) -> Self {
        if self.ring_capacity == 0 {
            tracing::warn!("ring_capacity of 0 is not usable, falling back to 1");
            self.ring_capacity = 1;
        }
        if self.max_create_attempts == 0 {
            self.max_create_attempts = 1;
        }
        if self.watchdog_poll_ms == 0 {
            self.watchdog_poll_ms = 10;
        }
        if self.pump_interval_ms == 0 {
            self.pump_interval_ms = 1;
        }
        if self.ready_timeout_ms == 0 {
            self.ready_timeout_ms = 5000;
        }
        self.target_fps = self.target_fps.clamp(1, 1000);
        self
    }

    pub fn create_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.create_backoff_base_ms.saturating_mul(u64::from(attempt) + 1))
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn watchdog_poll(&self) -> Duration {
        Duration::from_millis(self.watchdog_poll_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Requested geometry and title of the main window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "ui-bridge".to_string(),
        }
    }
}

impl WindowSpec {
    pub fn new(width: u32, height: u32, title: impl Into<String>) -> Self {
        Self {
            width,
            height,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "ui-bridge".to_string(),
            debug: false,
            console: true,
        }
    }
}
