// Caller-side run loops
//
// Helpers for the consumer side of the bridge: poll a batch of events, hand
// it to user logic, reset the per-frame input state, repeat. Both loops end
// when the window closes or shutdown has been requested.

use crate::models::Event;
use crate::ui::controller::WindowLifecycleController;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub const DEFAULT_TICK: Duration = Duration::from_millis(15);
pub const DEFAULT_MAX_BATCH: usize = 32;
const PACED_BATCH: usize = 64;

/// Why a run loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop signal fired; the session has been shut down
    Stopped,
    /// A `Closed` event was observed
    Closed,
    /// Shutdown was requested elsewhere
    ShutdownRequested,
    /// The tick callback asked to stop
    Cancelled,
}

/// Poll on a fixed tick until the window closes, shutdown begins, `on_tick`
/// returns false or `stop` turns true.
///
/// A zero `tick` or `max_batch` falls back to 15ms / 32 events. Seeing the
/// stop signal shuts the session down before returning.
pub fn run_event_loop<F>(
    controller: &WindowLifecycleController,
    stop: &watch::Receiver<bool>,
    tick: Duration,
    max_batch: usize,
    mut on_tick: F,
) -> LoopExit
where
    F: FnMut(&[Event]) -> bool,
{
    let tick = if tick.is_zero() { DEFAULT_TICK } else { tick };
    let max_batch = if max_batch == 0 { DEFAULT_MAX_BATCH } else { max_batch };

    loop {
        if *stop.borrow() {
            tracing::info!("Stop signal received, shutting down");
            controller.shutdown();
            return LoopExit::Stopped;
        }

        let started = Instant::now();
        let (events, _more) = controller.poll_events(max_batch);
        let closed = events.iter().any(Event::is_closed);

        let keep_going = on_tick(&events);
        controller.reset_frame_state();

        if !keep_going {
            return LoopExit::Cancelled;
        }
        if closed {
            return LoopExit::Closed;
        }
        if controller.is_shutdown_requested() {
            return LoopExit::ShutdownRequested;
        }

        if let Some(remaining) = tick.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

/// Frame pacing and timing for [`run_paced`]
#[derive(Debug, Clone)]
pub struct FrameClock {
    target_fps: u32,
    last_frame: Option<Duration>,
    started: Instant,
}

impl FrameClock {
    pub fn new(target_fps: u32) -> Self {
        let mut clock = Self {
            target_fps: 60,
            last_frame: None,
            started: Instant::now(),
        };
        clock.set_target_fps(target_fps);
        clock
    }

    /// Zero means the default of 60; values above 1000 are clamped.
    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = if fps == 0 { 60 } else { fps.min(1000) };
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps
    }

    /// Duration of the last completed frame, or the frame budget before the first one.
    pub fn frame_time(&self) -> Duration {
        self.last_frame.unwrap_or_else(|| self.frame_budget())
    }

    /// Instantaneous rate derived from the last frame.
    pub fn fps(&self) -> u32 {
        match self.last_frame {
            Some(frame) if !frame.is_zero() => (1.0 / frame.as_secs_f64()).round().clamp(1.0, 100_000.0) as u32,
            _ => self.target_fps,
        }
    }

    /// Time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Sleep out the rest of the frame that began at `frame_start` and record its length.
    pub fn finish_frame(&mut self, frame_start: Instant) {
        if let Some(remaining) = self.frame_budget().checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
        self.last_frame = Some(frame_start.elapsed());
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Run `update` once per frame at the clock's target rate.
///
/// Each frame drains up to 64 events, calls `update` with them, then resets
/// the per-frame input state. Returning false from `update` ends the loop.
pub fn run_paced<F>(controller: &WindowLifecycleController, clock: &mut FrameClock, mut update: F) -> LoopExit
where
    F: FnMut(&WindowLifecycleController, &FrameClock, &[Event]) -> bool,
{
    loop {
        if controller.is_shutdown_requested() {
            return LoopExit::ShutdownRequested;
        }
        let frame_start = Instant::now();

        let (events, _more) = controller.poll_events(PACED_BATCH);
        let closed = events.iter().any(Event::is_closed);
        let keep_going = update(controller, clock, &events);
        controller.reset_frame_state();

        if !keep_going {
            return LoopExit::Cancelled;
        }
        if closed {
            return LoopExit::Closed;
        }

        clock.finish_frame(frame_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_clamps_target() {
        let mut clock = FrameClock::new(0);
        assert_eq!(clock.target_fps(), 60);
        clock.set_target_fps(5000);
        assert_eq!(clock.target_fps(), 1000);
        clock.set_target_fps(120);
        assert_eq!(clock.frame_budget(), Duration::from_secs(1) / 120);
    }

    #[test]
    fn test_frame_clock_before_first_frame() {
        let clock = FrameClock::new(50);
        assert_eq!(clock.frame_time(), Duration::from_millis(20));
        assert_eq!(clock.fps(), 50);
    }

    #[test]
    fn test_finish_frame_paces_to_budget() {
        let mut clock = FrameClock::new(100);
        let start = Instant::now();
        clock.finish_frame(start);
        assert!(clock.frame_time() >= Duration::from_millis(10));
        assert!(clock.fps() <= 100);
        assert!(clock.elapsed() >= Duration::from_millis(10));
    }
}
