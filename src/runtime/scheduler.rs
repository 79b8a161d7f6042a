// UiScheduler - the single way for any thread to mutate UI state
//
// A UI toolkit owns its widget tree on one thread. Worker threads never touch
// it directly; they enqueue callbacks that the UI thread runs later, in FIFO
// order. This module provides:
// - UiScheduler: cloneable, thread-safe handle used to enqueue callbacks
// - EventLoop: owns the view and the queue, runs callbacks on the UI thread
// - CallbackQueue: the receiving end, for toolkits that run their own loop

use super::error::RuntimeError;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A unit of UI work. Runs exactly once, on the UI thread, with the view.
pub type UiCallback<U> = Box<dyn FnOnce(&U) + Send + 'static>;

enum Message<U> {
    Run(UiCallback<U>),
    Quit,
}

/// Handle for scheduling work onto the UI thread
///
/// Cloneable and `Send + Sync` regardless of the view type: only the boxed
/// callbacks cross threads, never the view itself.
///
/// # Example
/// ```ignore
/// let scheduler = event_loop.scheduler();
/// std::thread::spawn(move || {
///     let apps = list_apps();
///     scheduler.enqueue(move |ui| ui.set_app_list(apps));
/// });
/// ```
pub struct UiScheduler<U> {
    tx: mpsc::UnboundedSender<Message<U>>,
    ui_thread: ThreadId,
    metrics: Arc<Metrics>,
}

// Manual Clone implementation to avoid requiring U: Clone
impl<U> Clone for UiScheduler<U> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            ui_thread: self.ui_thread,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<U: 'static> UiScheduler<U> {
    /// Queue a callback to run on the UI thread
    ///
    /// Never blocks. Callbacks enqueued from the same thread run in the order
    /// they were enqueued. Once the event loop has shut down the callback is
    /// dropped (along with everything it captured) and `false` is returned;
    /// that shutdown race is expected and not an error.
    pub fn enqueue<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&U) + Send + 'static,
    {
        match self.tx.send(Message::Run(Box::new(callback))) {
            Ok(()) => {
                self.metrics.record_ui_callback();
                true
            }
            Err(_) => {
                self.metrics.record_ui_callback_dropped();
                tracing::debug!("UI event loop has shut down - dropping callback");
                false
            }
        }
    }

    /// Ask the event loop to stop after the callbacks already queued
    pub fn quit(&self) {
        if self.tx.send(Message::Quit).is_err() {
            tracing::debug!("Quit requested after event loop shutdown");
        }
    }

    /// Whether the calling thread is the UI thread
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    /// Identity of the UI thread
    pub fn ui_thread(&self) -> ThreadId {
        self.ui_thread
    }

    /// Whether the event loop still accepts callbacks
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Event loop owning the view and the pending callback queue
///
/// Created on the UI thread at startup; that thread becomes the UI thread for
/// the lifetime of the loop. Dropping the loop (or calling
/// [`shutdown`](Self::shutdown)) closes the queue: later enqueues are no-ops
/// and callbacks still pending are discarded.
pub struct EventLoop<U> {
    view: U,
    rx: mpsc::UnboundedReceiver<Message<U>>,
    scheduler: UiScheduler<U>,
}

impl<U: 'static> EventLoop<U> {
    /// Create an event loop bound to the calling thread
    pub fn new(view: U) -> Self {
        Self::with_metrics(view, Arc::new(Metrics::new()))
    }

    /// Create an event loop that records queue activity into shared metrics
    pub fn with_metrics(view: U, metrics: Arc<Metrics>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = UiScheduler {
            tx,
            ui_thread: thread::current().id(),
            metrics,
        };

        tracing::debug!(ui_thread = ?scheduler.ui_thread, "UI event loop created");

        Self {
            view,
            rx,
            scheduler,
        }
    }

    /// Get a scheduler handle for this loop
    pub fn scheduler(&self) -> UiScheduler<U> {
        self.scheduler.clone()
    }

    /// The view owned by this loop (UI thread only, enforced by `U`'s own
    /// thread-safety: views are normally `!Sync`)
    pub fn view(&self) -> &U {
        &self.view
    }

    /// Run callbacks until [`UiScheduler::quit`] is called
    ///
    /// Blocks the calling thread, which must be the thread that created the loop.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.check_thread()?;
        tracing::info!("Starting UI event loop");

        while let Some(message) = self.rx.blocking_recv() {
            match message {
                Message::Run(callback) => callback(&self.view),
                Message::Quit => break,
            }
        }

        tracing::info!("UI event loop stopped");
        Ok(())
    }

    /// Run every callback queued so far without blocking
    ///
    /// Returns the number of callbacks executed. A pending quit request stops
    /// the drain early.
    pub fn run_pending(&mut self) -> Result<usize, RuntimeError> {
        self.check_thread()?;

        let mut executed = 0;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                Message::Run(callback) => {
                    callback(&self.view);
                    executed += 1;
                }
                Message::Quit => break,
            }
        }
        Ok(executed)
    }

    /// Run callbacks until `done` holds for the view or `timeout` elapses
    ///
    /// Returns whether the condition was reached.
    pub fn run_until<F>(&mut self, mut done: F, timeout: Duration) -> Result<bool, RuntimeError>
    where
        F: FnMut(&U) -> bool,
    {
        self.check_thread()?;

        let deadline = Instant::now() + timeout;
        loop {
            if done(&self.view) {
                return Ok(true);
            }

            match self.rx.try_recv() {
                Ok(Message::Run(callback)) => callback(&self.view),
                Ok(Message::Quit) => return Ok(done(&self.view)),
                Err(mpsc::error::TryRecvError::Empty) => {
                    if Instant::now() >= deadline {
                        return Ok(false);
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                Err(mpsc::error::TryRecvError::Disconnected) => return Ok(done(&self.view)),
            }
        }
    }

    /// Close the queue and hand back the view
    ///
    /// Pending callbacks are dropped without running.
    pub fn shutdown(mut self) -> U {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!("Discarded {} pending UI callbacks at shutdown", discarded);
        }
        self.view
    }

    /// Split into the view and the receiving queue
    ///
    /// For toolkits that run their own event loop: the view stays on the UI
    /// thread while the queue is drained elsewhere and each callback is
    /// re-posted into the toolkit (see the Slint bridge).
    pub fn into_parts(self) -> (U, CallbackQueue<U>) {
        (self.view, CallbackQueue { rx: self.rx })
    }

    fn check_thread(&self) -> Result<(), RuntimeError> {
        if self.scheduler.is_ui_thread() {
            Ok(())
        } else {
            Err(RuntimeError::WrongThread)
        }
    }
}

/// Receiving end of a scheduler's callback queue
pub struct CallbackQueue<U> {
    rx: mpsc::UnboundedReceiver<Message<U>>,
}

impl<U: 'static> CallbackQueue<U> {
    /// Block until the next callback is available
    ///
    /// Returns `None` after a quit request or once every scheduler is gone.
    /// Must not be called from inside an async context.
    pub fn blocking_next(&mut self) -> Option<UiCallback<U>> {
        match self.rx.blocking_recv()? {
            Message::Run(callback) => Some(callback),
            Message::Quit => None,
        }
    }

    /// Stop accepting callbacks; later enqueues return `false`
    pub fn close(&mut self) {
        self.rx.close();
    }
}
