// UI module - the UI-owning thread and everything that talks to it
//
// This module contains:
// - NativeHost / HostSink: the seam to the platform windowing layer
// - UiDispatcher: marshals work onto the UI-owning thread
// - WindowLifecycleController: start, window creation, shutdown, watchdog
// - HeadlessHost: an in-process host for tests and the demo binary
// - run_event_loop / run_paced: caller-side polling loops

pub mod bridge;
pub mod controller;
pub mod headless;
pub mod host;
pub mod run_loop;

pub use bridge::{DispatchError, UiContext, UiDispatcher, UiTask};
pub use controller::{
    BridgeError, ControllerBuilder, Terminator, WindowLifecycleController, process_exit_terminator,
};
pub use headless::{HeadlessHost, HeadlessInjector};
pub use host::{
    CreateOutcome, EventLoopWaker, HostError, HostSink, NativeHost, RetryDecision, RetryPolicy,
    default_retry_policy,
};
pub use run_loop::{FrameClock, LoopExit, run_event_loop, run_paced};
