// ui-bridge - Cross-thread bridge between a UI-owning thread and application threads
//
// This is the library crate. A dedicated thread owns the native host (message
// pump, window, input); every other thread talks to it through the
// WindowLifecycleController: polled events, input state queries, direct
// callbacks and marshaled tasks. The binary crate (main.rs) is a headless demo.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::BridgeMetrics;
pub use models::{
    Action, BridgeConfig, Event, KeyCode, LifecycleState, LoggingConfig, Modifiers, MouseButton, RawInput,
    RuntimeState, WindowHandle, WindowSpec,
};
pub use services::{CallbackSlot, RingEventQueue};
pub use state::{LifecycleChange, LifecycleManager};
pub use ui::{
    BridgeError, HeadlessHost, HeadlessInjector, HostError, NativeHost, UiDispatcher, WindowLifecycleController,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
