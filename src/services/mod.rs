//! Services module - the leaf components shared between the UI-owning thread and callers.
//!
//! None of these components know about threads, hosts or lifecycles. They are
//! plain synchronized data structures that the
//! [`WindowLifecycleController`](crate::ui::WindowLifecycleController) wires together.
//!
//! # Components
//!
//! - [`RingEventQueue`]: bounded, overwrite-oldest event queue. The UI thread
//!   pushes; callers drain with `pop_batch` once per frame.
//! - [`InputStateTracker`]: derives held / pressed / released / repeat state
//!   and the key and character FIFOs from raw down/up notifications.
//!   Characters come from a pluggable [`CharTranslator`].
//! - [`CallbackRegistry`]: one handler per [`CallbackSlot`], replaced atomically.
//! - [`ResizeDebouncer`]: quiet-period filter in front of a resize handler,
//!   driven by tokio timers.
//!
//! # Locking
//!
//! Every component owns its own narrow locks. No method hands out a guard or
//! a mutable reference. Registry handlers and the character translator run
//! with no lock held. A timer-driven resize delivery holds only the
//! debouncer's own delivery lock, which [`ResizeDebouncer::wait_idle`] waits on;
//! [`ResizeDebouncer::disarm`] never touches it.

pub mod callbacks;
pub mod debounce;
pub mod input_state;
pub mod ring_queue;

pub use callbacks::{Callback, CallbackRegistry, CallbackSlot, CloseHandler, InputHandler, ResizeHandler};
pub use debounce::ResizeDebouncer;
pub use input_state::{CharTranslator, InputStateTracker, UsLayoutTranslator};
pub use ring_queue::RingEventQueue;
