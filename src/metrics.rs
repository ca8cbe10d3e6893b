// Bridge metrics module
//
// Lock-free counters describing traffic through the bridge for one session

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-session bridge counters
///
/// Uses atomic operations so the UI-owning thread can bump counters without
/// taking any lock. The controller logs a summary once teardown completes.
#[derive(Debug)]
pub struct BridgeMetrics {
    /// Events pushed into the ring
    pub events_enqueued: AtomicU64,

    /// Events lost to ring overwrite
    pub events_dropped: AtomicU64,

    pub key_notifications: AtomicU64,
    pub mouse_notifications: AtomicU64,
    pub resize_notifications: AtomicU64,

    /// Handler invocations that actually reached a registered callback
    pub callbacks_invoked: AtomicU64,

    /// Resize deliveries made by a debounce timer
    pub debounced_resizes: AtomicU64,

    pub create_attempts: AtomicU64,
    pub create_retries: AtomicU64,

    /// Calls to `shutdown`, including the fast-path ones
    pub shutdown_calls: AtomicU64,

    pub watchdog_arms: AtomicU64,

    start_time: Instant,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self {
            events_enqueued: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            key_notifications: AtomicU64::new(0),
            mouse_notifications: AtomicU64::new(0),
            resize_notifications: AtomicU64::new(0),
            callbacks_invoked: AtomicU64::new(0),
            debounced_resizes: AtomicU64::new(0),
            create_attempts: AtomicU64::new(0),
            create_retries: AtomicU64::new(0),
            shutdown_calls: AtomicU64::new(0),
            watchdog_arms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Mirror the ring's own overflow counter, which is the source of truth
    pub fn sync_dropped(&self, overflow: u64) {
        self.events_dropped.fetch_max(overflow, Ordering::Relaxed);
    }

    pub fn record_key(&self) {
        self.key_notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mouse(&self) {
        self.mouse_notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resize(&self) {
        self.resize_notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback(&self) {
        self.callbacks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_debounced_resize(&self) {
        self.debounced_resizes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_create_attempt(&self) {
        self.create_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_create_retry(&self) {
        self.create_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shutdown_call(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_watchdog_arm(&self) {
        self.watchdog_arms.fetch_add(1, Ordering::Relaxed);
    }

    /// Get session uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Bridge Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Events: {} enqueued, {} dropped",
            self.events_enqueued.load(Ordering::Relaxed),
            self.events_dropped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Notifications: {} key, {} mouse, {} resize",
            self.key_notifications.load(Ordering::Relaxed),
            self.mouse_notifications.load(Ordering::Relaxed),
            self.resize_notifications.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Callbacks: {} invoked, {} debounced resizes",
            self.callbacks_invoked.load(Ordering::Relaxed),
            self.debounced_resizes.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Window creation: {} attempts, {} retries",
            self.create_attempts.load(Ordering::Relaxed),
            self.create_retries.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Shutdown: {} calls, {} watchdog arms",
            self.shutdown_calls.load(Ordering::Relaxed),
            self.watchdog_arms.load(Ordering::Relaxed)
        );
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = BridgeMetrics::new();
        assert_eq!(metrics.events_enqueued.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.shutdown_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_notification_counters() {
        let metrics = BridgeMetrics::new();

        metrics.record_key();
        metrics.record_key();
        metrics.record_mouse();
        metrics.record_resize();
        metrics.record_enqueued();

        assert_eq!(metrics.key_notifications.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.mouse_notifications.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.resize_notifications.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.events_enqueued.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_sync_dropped_is_monotonic() {
        let metrics = BridgeMetrics::new();
        metrics.sync_dropped(5);
        metrics.sync_dropped(3);
        assert_eq!(metrics.events_dropped.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_counters_from_many_threads() {
        let metrics = std::sync::Arc::new(BridgeMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record_callback();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.callbacks_invoked.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn test_uptime() {
        let metrics = BridgeMetrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
