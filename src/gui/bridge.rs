// EventLoopBridge - forwards the UI scheduler queue into Slint's event loop
//
// Slint owns the main thread while `run()` blocks, so the scheduler queue can't
// be drained there directly. A forwarder thread waits on the queue and re-posts
// every callback with `slint::invoke_from_event_loop`. The view lives in a
// thread-local on the UI thread; posted callbacks look it up when they run.

use super::view::SlintView;
use crate::runtime::{CallbackQueue, UiCallback, UiScheduler};
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::thread::{self, JoinHandle};

thread_local! {
    static VIEW: RefCell<Option<SlintView>> = const { RefCell::new(None) };
}

/// The installed view, if the caller is the UI thread and the bridge is up
pub fn current_view() -> Option<SlintView> {
    VIEW.with(|slot| slot.borrow().clone())
}

/// Owns the forwarder thread for the lifetime of the window
///
/// # Example
/// ```ignore
/// let scheduler = event_loop.scheduler();
/// let (view, queue) = event_loop.into_parts();
/// let bridge = EventLoopBridge::new(view, queue, scheduler)?;
/// window.run()?;
/// bridge.shutdown();
/// ```
pub struct EventLoopBridge {
    scheduler: UiScheduler<SlintView>,
    forwarder: Option<JoinHandle<()>>,
}

impl EventLoopBridge {
    /// Install `view` on the calling (UI) thread and start forwarding
    pub fn new(
        view: SlintView,
        queue: CallbackQueue<SlintView>,
        scheduler: UiScheduler<SlintView>,
    ) -> Result<Self> {
        VIEW.with(|slot| *slot.borrow_mut() = Some(view));

        let forwarder = thread::Builder::new()
            .name("ui-bridge".to_string())
            .spawn(move || forward(queue))
            .context("Failed to start UI bridge thread")?;

        Ok(Self {
            scheduler,
            forwarder: Some(forwarder),
        })
    }

    /// Stop forwarding and drop the view
    ///
    /// Must be called on the UI thread after the Slint event loop has returned.
    /// Callbacks still queued are discarded, which releases any worker waiting
    /// on a dialog.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(forwarder) = self.forwarder.take() else {
            return;
        };

        self.scheduler.quit();
        if forwarder.join().is_err() {
            tracing::warn!("UI bridge thread panicked");
        }

        if let Some(view) = VIEW.with(|slot| slot.borrow_mut().take()) {
            view.abandon_dialog();
        }
        tracing::debug!("UI bridge shut down");
    }
}

impl Drop for EventLoopBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward(mut queue: CallbackQueue<SlintView>) {
    tracing::debug!("UI bridge thread started");

    while let Some(callback) = queue.blocking_next() {
        if let Err(e) = slint::invoke_from_event_loop(move || run_on_view(callback)) {
            tracing::warn!("Failed to queue UI callback to event loop: {:?}", e);
            // The event loop has stopped; refuse further callbacks
            queue.close();
            break;
        }
    }

    tracing::debug!("UI bridge thread terminated");
}

fn run_on_view(callback: UiCallback<SlintView>) {
    match current_view() {
        Some(view) => callback(&view),
        None => tracing::debug!("UI callback arrived after the view was dropped"),
    }
}
