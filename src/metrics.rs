// Runtime metrics module
//
// Lightweight counters for the task engine: how many tasks ran, how they ended,
// and how much traffic went through the UI callback queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Engine counters
///
/// Uses atomic operations so worker threads and the UI thread can record
/// without locks. Logged on shutdown for diagnostics.
#[derive(Debug)]
pub struct Metrics {
    /// Tasks whose body was handed to a worker thread
    pub tasks_started: AtomicU64,

    /// Task bodies that returned a value
    pub tasks_succeeded: AtomicU64,

    /// Task bodies that returned an error
    pub tasks_failed: AtomicU64,

    /// Task bodies that panicked
    pub tasks_panicked: AtomicU64,

    /// Callbacks accepted by the UI queue
    pub ui_callbacks: AtomicU64,

    /// Callbacks dropped because the UI had shut down
    pub ui_callbacks_dropped: AtomicU64,

    /// Interactive sessions that opened a dialog
    pub sessions_opened: AtomicU64,

    /// Total time spent in task bodies in milliseconds
    pub total_body_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_started: AtomicU64::new(0),
            tasks_succeeded: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            ui_callbacks: AtomicU64::new(0),
            ui_callbacks_dropped: AtomicU64::new(0),
            sessions_opened: AtomicU64::new(0),
            total_body_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_started(&self) {
        self.tasks_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_succeeded(&self) {
        self.tasks_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_panicked(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_body_time(&self, duration: Duration) {
        self.total_body_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_ui_callback(&self) {
        self.ui_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_callback_dropped(&self) {
        self.ui_callbacks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Tasks whose body has finished, however it ended
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_succeeded.load(Ordering::Relaxed)
            + self.tasks_failed.load(Ordering::Relaxed)
            + self.tasks_panicked.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average body duration in milliseconds over finished tasks
    pub fn avg_body_time_ms(&self) -> f64 {
        let total = self.total_body_time_ms.load(Ordering::Relaxed);
        let count = self.tasks_finished();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Task Engine Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Tasks: {} started, {} succeeded, {} failed, {} panicked (avg body: {:.2}ms)",
            self.tasks_started.load(Ordering::Relaxed),
            self.tasks_succeeded.load(Ordering::Relaxed),
            self.tasks_failed.load(Ordering::Relaxed),
            self.tasks_panicked.load(Ordering::Relaxed),
            self.avg_body_time_ms()
        );
        tracing::info!(
            "UI callbacks: {} queued, {} dropped after shutdown",
            self.ui_callbacks.load(Ordering::Relaxed),
            self.ui_callbacks_dropped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Interactive sessions opened: {}",
            self.sessions_opened.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
