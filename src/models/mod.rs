//! Data models shared by every layer of the bridge.
//!
//! - [`Event`]: the discriminated notification stored in the event ring
//! - [`RawInput`]: a decoded key/mouse notification, plus the narrow native ABI packing
//! - [`Modifiers`]: side-specific modifier bitmask
//! - [`LifecycleState`] / [`RuntimeState`]: session progression and its diagnostic snapshot
//! - [`BridgeConfig`]: tunables loaded by [`ConfigManager`](crate::config::ConfigManager)
//!
//! Nothing in here locks or spawns; the types are plain values that the
//! services and the controller pass between threads.

pub mod config;
pub mod event;
pub mod lifecycle;

pub use config::{BridgeConfig, LoggingConfig, WindowSpec};
pub use event::{
    Action, Event, InputKind, KeyCode, Modifiers, MouseButton, RawInput, WindowHandle,
    MOUSE_BUTTON_LEFT, MOUSE_BUTTON_MIDDLE, MOUSE_BUTTON_RIGHT, decode_resize_bits, round_size,
};
pub use lifecycle::{LifecycleState, RuntimeState};
