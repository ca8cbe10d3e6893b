use crate::models::Event;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Receives the rounded window size in pixels.
pub type ResizeHandler = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Receives every key or mouse event after the input tracker has seen it.
pub type InputHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Fired once when the session has finished tearing down.
pub type CloseHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackSlot {
    Resize,
    Input,
    Close,
}

/// A handler bound for one particular slot.
#[derive(Clone)]
pub enum Callback {
    Resize(ResizeHandler),
    Input(InputHandler),
    Close(CloseHandler),
}

impl Callback {
    pub fn slot(&self) -> CallbackSlot {
        match self {
            Callback::Resize(_) => CallbackSlot::Resize,
            Callback::Input(_) => CallbackSlot::Input,
            Callback::Close(_) => CallbackSlot::Close,
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback::{:?}", self.slot())
    }
}

/// Single-slot handler storage for resize, input and close notifications.
///
/// Each slot holds at most one `Arc` handler. Registering swaps the whole
/// reference under a write lock, so an invoker sees either the old handler or
/// the new one. Invocation clones the `Arc` out and releases the lock before
/// calling, which lets a handler re-register itself without deadlocking.
#[derive(Default)]
pub struct CallbackRegistry {
    resize: RwLock<Option<ResizeHandler>>,
    input: RwLock<Option<InputHandler>>,
    close: RwLock<Option<CloseHandler>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content of the callback's slot.
    pub fn register(&self, callback: Callback) {
        tracing::debug!(slot = ?callback.slot(), "registering callback");
        match callback {
            Callback::Resize(handler) => *write(&self.resize) = Some(handler),
            Callback::Input(handler) => *write(&self.input) = Some(handler),
            Callback::Close(handler) => *write(&self.close) = Some(handler),
        }
    }

    /// Empty a slot. Returns whether a handler was present.
    pub fn unregister(&self, slot: CallbackSlot) -> bool {
        let removed = match slot {
            CallbackSlot::Resize => write(&self.resize).take().is_some(),
            CallbackSlot::Input => write(&self.input).take().is_some(),
            CallbackSlot::Close => write(&self.close).take().is_some(),
        };
        if removed {
            tracing::debug!(?slot, "callback unregistered");
        }
        removed
    }

    pub fn is_registered(&self, slot: CallbackSlot) -> bool {
        match slot {
            CallbackSlot::Resize => read(&self.resize).is_some(),
            CallbackSlot::Input => read(&self.input).is_some(),
            CallbackSlot::Close => read(&self.close).is_some(),
        }
    }

    /// Empty every slot.
    pub fn clear_all(&self) {
        write(&self.resize).take();
        write(&self.input).take();
        write(&self.close).take();
    }

    /// Remove and return the close handler.
    pub fn take_close(&self) -> Option<CloseHandler> {
        write(&self.close).take()
    }

    /// Call the resize handler if one is registered. Returns whether it ran.
    pub fn invoke_resize(&self, width: u32, height: u32) -> bool {
        let handler = read(&self.resize).clone();
        match handler {
            Some(handler) => {
                handler(width, height);
                true
            }
            None => false,
        }
    }

    pub fn invoke_input(&self, event: &Event) -> bool {
        let handler = read(&self.input).clone();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    pub fn invoke_close(&self) -> bool {
        let handler = read(&self.close).clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}
