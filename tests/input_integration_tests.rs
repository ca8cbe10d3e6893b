//! End-to-end input tests through the headless host
//!
//! Notifications are injected on the test thread, replayed on the UI-owning
//! thread and observed from the test thread through the controller's polling,
//! query and callback surfaces.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use ui_bridge::models::{MOUSE_BUTTON_LEFT, MOUSE_BUTTON_RIGHT, RawInput};
use ui_bridge::ui::{FrameClock, HeadlessHost, HeadlessInjector, LoopExit, run_event_loop, run_paced};
use ui_bridge::{Action, BridgeConfig, Event, Modifiers, RingEventQueue, WindowLifecycleController, WindowSpec};

fn fast_config() -> BridgeConfig {
    BridgeConfig {
        create_backoff_base_ms: 1,
        watchdog_timeout_ms: 500,
        watchdog_poll_ms: 10,
        pump_interval_ms: 5,
        ..BridgeConfig::default()
    }
}

fn session(config: BridgeConfig) -> (WindowLifecycleController, HeadlessInjector) {
    ui_bridge::logging::try_init_test_logging();
    let (host, injector) = HeadlessHost::new();
    let controller = WindowLifecycleController::builder(host)
        .config(config)
        .terminator(Arc::new(|| {}))
        .build()
        .unwrap();
    controller.init().unwrap();
    controller
        .create_window_and_wait(WindowSpec::default(), Duration::from_secs(2))
        .unwrap();
    // Drop the Created notification so tests start from an empty ring
    let _ = controller.poll_events(16);
    (controller, injector)
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_key_down_up_observed_in_order() {
    let queue = RingEventQueue::new(8);
    queue.push(Event::key(0x41, Action::Down));
    queue.push(Event::key(0x41, Action::Up));

    let (events, more) = queue.pop_batch(10);
    assert_eq!(events, vec![Event::key(0x41, Action::Down), Event::key(0x41, Action::Up)]);
    assert!(!more);
}

#[test]
fn test_injected_keys_reach_queries_and_queue() {
    let (controller, injector) = session(fast_config());

    injector.key(0x41, Action::Down, Modifiers::LSHIFT);
    injector.key(0x41, Action::Down, Modifiers::LSHIFT);
    assert!(wait_until(Duration::from_secs(2), || controller.is_key_repeat(0x41)));

    assert!(controller.is_key_down(0x41));
    assert!(controller.is_key_pressed(0x41));
    assert!(controller.modifiers().is_shift_down());
    assert_eq!(controller.dequeue_key_press(), Some(0x41));
    assert_eq!(controller.dequeue_key_press(), None);
    // Repeats do not type again
    assert_eq!(controller.dequeue_char(), Some('A'));
    assert_eq!(controller.dequeue_char(), None);

    controller.reset_frame_state();
    assert!(controller.is_key_down(0x41));
    assert!(!controller.is_key_pressed(0x41));
    assert!(!controller.is_key_repeat(0x41));

    injector.key(0x41, Action::Up, Modifiers::empty());
    assert!(wait_until(Duration::from_secs(2), || controller.is_key_released(0x41)));
    assert!(controller.is_key_up(0x41));

    let (events, _) = controller.poll_events(10);
    let actions: Vec<Action> = events
        .iter()
        .filter_map(|event| match event {
            Event::Key { code: 0x41, action, .. } => Some(*action),
            _ => None,
        })
        .collect();
    assert_eq!(actions, vec![Action::Down, Action::Down, Action::Up]);
}

#[test]
fn test_packed_native_input_is_decoded() {
    let (controller, injector) = session(fast_config());

    let (kind, code_with_mods, action, packed_xy) =
        RawInput::mouse(MOUSE_BUTTON_RIGHT, Action::Down, Modifiers::RCONTROL, -12, 480).pack();
    injector.raw(kind, code_with_mods, action, packed_xy);
    // Unknown kinds are ignored
    injector.raw(9, 0, 1, 0);

    assert!(wait_until(Duration::from_secs(2), || controller
        .is_mouse_button_down(MOUSE_BUTTON_RIGHT)));
    assert_eq!(controller.mouse_position(), (-12, 480));
    assert!(controller.modifiers().is_control_down());
    assert!(controller.is_mouse_button_pressed(MOUSE_BUTTON_RIGHT));
    assert!(controller.is_mouse_button_up(MOUSE_BUTTON_LEFT));

    thread::sleep(Duration::from_millis(30));
    let (events, _) = controller.poll_events(10);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_input_handler_sees_every_event() {
    let (controller, injector) = session(fast_config());
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        controller.register_input_handler(move |event: &Event| seen.lock().unwrap().push(*event));
    }

    injector.mouse(MOUSE_BUTTON_LEFT, Action::Down, Modifiers::empty(), 5, 6);
    injector.mouse(MOUSE_BUTTON_LEFT, Action::Up, Modifiers::empty(), 7, 8);
    injector.key(0x20, Action::Down, Modifiers::empty());

    assert!(wait_until(Duration::from_secs(2), || seen.lock().unwrap().len() == 3));
    let seen = seen.lock().unwrap();
    assert!(matches!(seen[0], Event::Mouse { action: Action::Down, x: 5, y: 6, .. }));
    assert!(matches!(seen[1], Event::Mouse { action: Action::Up, x: 7, y: 8, .. }));
    assert!(matches!(seen[2], Event::Key { code: 0x20, .. }));
}

#[test]
fn test_ring_overflow_keeps_newest() {
    let config = BridgeConfig {
        ring_capacity: 4,
        ..fast_config()
    };
    let (controller, injector) = session(config);

    for code in 0..10u16 {
        injector.key(0x41 + code, Action::Down, Modifiers::empty());
    }
    assert!(wait_until(Duration::from_secs(2), || controller
        .metrics()
        .key_notifications
        .load(Ordering::SeqCst)
        == 10));

    let (events, more) = controller.poll_events(16);
    assert!(!more);
    let codes: Vec<u16> = events
        .iter()
        .filter_map(|event| match event {
            Event::Key { code, .. } => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(codes, vec![0x47, 0x48, 0x49, 0x4A]);
    assert_eq!(controller.overflow_count(), 6);
    assert_eq!(controller.runtime_state().overflow_count, 6);
    assert_eq!(controller.metrics().events_dropped.load(Ordering::SeqCst), 6);
}

#[test]
fn test_resize_bits_reach_undebounced_handler() {
    let (controller, injector) = session(fast_config());
    let sizes = Arc::new(Mutex::new(Vec::new()));
    {
        let sizes = sizes.clone();
        controller.register_resize_handler(move |w, h| sizes.lock().unwrap().push((w, h)), Duration::ZERO);
    }

    injector.resize_bits(1023.6, 767.4);
    assert!(wait_until(Duration::from_secs(2), || !sizes.lock().unwrap().is_empty()));

    assert_eq!(*sizes.lock().unwrap(), vec![(1024, 767)]);
    assert!(controller.is_window_resized());
    let (events, _) = controller.poll_events(4);
    assert_eq!(
        events,
        vec![Event::Resize {
            width: 1023.6,
            height: 767.4
        }]
    );
}

#[test]
fn test_resize_burst_is_debounced() {
    let (controller, injector) = session(fast_config());
    let calls = Arc::new(Mutex::new(Vec::new()));
    {
        let calls = calls.clone();
        controller.register_resize_handler(
            move |w, h| calls.lock().unwrap().push((w, h, Instant::now())),
            Duration::from_millis(100),
        );
    }

    for step in 1..=10u32 {
        injector.resize(f64::from(100 * step), 50.0);
        thread::sleep(Duration::from_millis(5));
    }
    let last_sent = Instant::now();

    thread::sleep(Duration::from_millis(400));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (w, h, at) = calls[0];
    assert_eq!((w, h), (1000, 50));
    assert!(at + Duration::from_millis(10) >= last_sent + Duration::from_millis(100));
    assert_eq!(controller.metrics().debounced_resizes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unregister_resize_cancels_pending_delivery() {
    let (controller, injector) = session(fast_config());
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = calls.clone();
        controller.register_resize_handler(
            move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(150),
        );
    }

    injector.resize(300.0, 200.0);
    assert!(wait_until(Duration::from_secs(2), || controller.is_window_resized()));
    controller.unregister_handler(ui_bridge::CallbackSlot::Resize);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_replacing_resize_handler_silences_old_timer() {
    let (controller, injector) = session(fast_config());
    let old_calls = Arc::new(AtomicUsize::new(0));
    let new_calls = Arc::new(AtomicUsize::new(0));
    {
        let old_calls = old_calls.clone();
        controller.register_resize_handler(
            move |_, _| {
                old_calls.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(150),
        );
    }

    injector.resize(300.0, 200.0);
    assert!(wait_until(Duration::from_secs(2), || controller.is_window_resized()));
    {
        let new_calls = new_calls.clone();
        controller.register_resize_handler(
            move |_, _| {
                new_calls.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(150),
        );
    }

    thread::sleep(Duration::from_millis(300));
    assert_eq!(old_calls.load(Ordering::SeqCst), 0);
    assert_eq!(new_calls.load(Ordering::SeqCst), 0);

    injector.resize(400.0, 300.0);
    assert!(wait_until(Duration::from_secs(2), || new_calls.load(Ordering::SeqCst) == 1));
    assert_eq!(old_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_event_loop_stops_on_signal() {
    let (controller, _injector) = session(fast_config());
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut ticks = 0;
    let exit = run_event_loop(&controller, &stop_rx, Duration::from_millis(2), 8, |_| {
        ticks += 1;
        if ticks == 3 {
            stop_tx.send(true).unwrap();
        }
        true
    });

    assert_eq!(exit, LoopExit::Stopped);
    assert_eq!(ticks, 3);
    assert!(controller.is_finished());
}

#[test]
fn test_event_loop_ends_when_window_closes() {
    let (controller, injector) = session(fast_config());
    let (_stop_tx, stop_rx) = watch::channel(false);

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        injector.close();
    });
    let exit = run_event_loop(&controller, &stop_rx, Duration::ZERO, 0, |_| true);
    closer.join().unwrap();

    // Teardown may wipe the ring before the Closed event is polled
    assert!(matches!(exit, LoopExit::Closed | LoopExit::ShutdownRequested));
    assert!(wait_until(Duration::from_secs(3), || controller.is_finished()));
}

#[test]
fn test_event_loop_resets_frame_state_after_tick() {
    let (controller, injector) = session(fast_config());
    let (_stop_tx, stop_rx) = watch::channel(false);
    injector.key(0x42, Action::Down, Modifiers::empty());

    let exit = run_event_loop(&controller, &stop_rx, Duration::from_millis(2), 4, |events| {
        !events.iter().any(|event| matches!(event, Event::Key { code: 0x42, .. }))
    });

    assert_eq!(exit, LoopExit::Cancelled);
    assert!(controller.is_key_down(0x42));
    assert!(!controller.is_key_pressed(0x42));
    assert_eq!(controller.dequeue_key_press(), None);
}

#[test]
fn test_paced_loop_runs_at_target_rate() {
    let (controller, _injector) = session(fast_config());
    let mut clock = FrameClock::new(200);

    let started = Instant::now();
    let mut frames = 0;
    let exit = run_paced(&controller, &mut clock, |_, _, _| {
        frames += 1;
        frames < 5
    });

    assert_eq!(exit, LoopExit::Cancelled);
    assert_eq!(frames, 5);
    // Four full frames were paced before the fifth asked to stop
    assert!(started.elapsed() >= Duration::from_millis(19));
    assert!(clock.frame_time() >= Duration::from_millis(4));
    assert!(clock.fps() <= 250);
}
