//! ui-bridge - headless demo of the UI-thread bridge
//!
//! # Overview
//!
//! Runs a complete session against the in-process [`HeadlessHost`]:
//! - Logging infrastructure (file rotation + console output)
//! - Configuration loading ([`ConfigManager`], `ui-bridge.yaml` + `UI_BRIDGE__*`)
//! - Session start and main window creation ([`WindowLifecycleController`])
//! - A scripted "user" thread that types, clicks, resizes and finally closes the window
//! - The caller-side poll loop ([`run_event_loop`]) printing what it sees
//!
//! # Execution Flow
//!
//! 1. Load configuration from `ui-bridge/` (defaults if missing)
//! 2. Initialize logging → logs/ui-bridge.<date>
//! 3. Start the UI-owning thread and wait for the host to report ready
//! 4. Create the main window and wait for it
//! 5. Poll events until the window is closed or the stop timer fires
//! 6. Shut down (exactly once) and print the runtime state

use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use ui_bridge::models::{MOUSE_BUTTON_LEFT, Modifiers};
use ui_bridge::ui::run_event_loop;
use ui_bridge::{
    APP_NAME, Action, ConfigManager, Event, HeadlessHost, HeadlessInjector, VERSION, WindowLifecycleController,
};

/// Plays the part of a user at the keyboard.
fn drive_input(injector: HeadlessInjector) {
    let pause = Duration::from_millis(40);
    for code in [0x48u16, 0x49] {
        injector.key(code, Action::Down, Modifiers::empty());
        thread::sleep(pause);
        injector.key(code, Action::Up, Modifiers::empty());
        thread::sleep(pause);
    }

    injector.mouse(MOUSE_BUTTON_LEFT, Action::Down, Modifiers::empty(), 120, 80);
    thread::sleep(pause);
    injector.mouse(MOUSE_BUTTON_LEFT, Action::Up, Modifiers::empty(), 121, 80);

    for step in 0..5u32 {
        injector.resize(800.0 + f64::from(step) * 10.0, 600.0);
    }
    thread::sleep(Duration::from_millis(400));

    injector.close();
}

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("ui-bridge")?;
    let config = config_manager.load()?;

    let _log_guard = ui_bridge::logging::setup_logging(&config.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let (host, injector) = HeadlessHost::new();
    let controller = WindowLifecycleController::new(host, config.clone())
        .context("Failed to build window lifecycle controller")?;

    controller.register_resize_handler_default(|width, height| {
        tracing::info!("Resize settled at {}x{}", width, height);
    });
    controller.register_close_handler(|| tracing::info!("Session closed"));

    controller.init().context("UI thread failed to start")?;
    let window = controller
        .create_window_and_wait(config.window.clone(), Duration::ZERO)
        .context("Main window was not created")?;
    tracing::info!("Main window {:?} is up", window);

    let (stop_tx, stop_rx) = watch::channel(false);
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(10));
        let _ = stop_tx.send(true);
    });

    let user = thread::spawn(move || drive_input(injector));

    let exit = run_event_loop(&controller, &stop_rx, Duration::ZERO, 0, |events| {
        for event in events {
            match event {
                Event::Key { code, action, .. } => tracing::info!("key {:#04x} {:?}", code, action),
                Event::Mouse {
                    button, action, x, y, ..
                } => {
                    tracing::info!("mouse {} {:?} at ({}, {})", button, action, x, y)
                }
                Event::Resize { width, height } => tracing::debug!("resize {}x{}", width, height),
                Event::Created => tracing::info!("window created"),
                Event::Closed => tracing::info!("window closed"),
            }
        }
        let mut typed = String::new();
        while let Some(c) = controller.dequeue_char() {
            typed.push(c);
        }
        if !typed.is_empty() {
            tracing::info!("typed {:?}", typed);
        }
        true
    });
    tracing::info!("Event loop finished: {:?}", exit);

    let _ = user.join();
    controller.shutdown();

    let state = controller.runtime_state();
    tracing::info!(
        "Final state: {:?}, overflow={}, last_error={:?}",
        state.state,
        state.overflow_count,
        state.last_error
    );
    Ok(())
}
