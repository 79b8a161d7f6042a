// InteractiveSession - a worker thread driving a modal dialog
//
// The worker starts the platform backend, reads the tweak list, and if there is
// anything to show asks the UI thread to open the tweak dialog. It then blocks
// on a completion flag until the dialog is dismissed, and stops the backend.
//
// The flag is created before the dialog callback is enqueued and travels inside
// that callback. If the callback never runs (the UI shut down first), dropping
// it drops the flag, which releases the worker. There is no path on which the
// worker can wait for a dialog that will never exist.

use super::log_sink::LogSink;
use super::scheduler::UiScheduler;
use super::task::TaskContext;
use crate::metrics::Metrics;
use crate::models::{TweakId, TweakItem};
use crate::services::{PlatformBackend, TweakProvider};
use anyhow::{Context, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::oneshot;

/// How a tweak dialog was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    /// Pending edits were written, then the dialog closed itself
    Applied,
    /// The user closed the dialog without applying
    Cancelled,
    /// The dialog never opened or was torn down with the UI
    Abandoned,
}

/// Create a one-shot completion flag and its waiting side
///
/// A fresh pair is created per session and never reused.
pub fn completion_flag() -> (CompletionFlag, CompletionWaiter) {
    let (tx, rx) = oneshot::channel();
    (CompletionFlag { tx }, CompletionWaiter { rx })
}

/// Setting side of the completion flag, owned by the dialog
///
/// [`set`](Self::set) consumes the flag, so it can be set at most once.
/// Dropping it unset releases the waiter with [`Dismissal::Abandoned`].
#[derive(Debug)]
pub struct CompletionFlag {
    tx: oneshot::Sender<Dismissal>,
}

impl CompletionFlag {
    pub fn set(self, dismissal: Dismissal) {
        // The waiter is gone only if the worker already returned
        let _ = self.tx.send(dismissal);
    }
}

/// Waiting side of the completion flag, owned by the worker thread
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: oneshot::Receiver<Dismissal>,
}

impl CompletionWaiter {
    /// Block until the flag is set or dropped. No timeout.
    ///
    /// Must be called from a plain thread, not from inside an async runtime.
    pub fn wait(self) -> Dismissal {
        self.rx.blocking_recv().unwrap_or(Dismissal::Abandoned)
    }
}

/// Messages produced by the tweak dialog's controls
///
/// Each checkbox reports its item id and requested state instead of carrying
/// its own closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TweakMessage {
    Toggle { id: TweakId, enabled: bool },
    Apply,
    Cancel,
}

/// A view able to host the tweak dialog. UI thread only.
pub trait DialogHost: 'static {
    /// Display `dialog` modally
    fn show_tweak_dialog(&self, dialog: TweakDialog);

    /// The dialog currently shown, if any
    fn tweak_dialog(&self) -> Option<TweakDialog>;

    /// Hide and forget the current dialog
    fn close_tweak_dialog(&self);
}

type DialogObserver = Box<dyn Fn(&TweakDialog)>;

/// UI-thread model of the tweak dialog
///
/// Cheap to clone (shared handle); not `Send`. Holds the item snapshot, the
/// enabled state of its controls and the session's completion flag.
#[derive(Clone)]
pub struct TweakDialog {
    inner: Rc<DialogInner>,
}

struct DialogInner {
    provider: Arc<dyn TweakProvider>,
    items: RefCell<Vec<TweakItem>>,
    controls_enabled: Cell<bool>,
    completion: RefCell<Option<CompletionFlag>>,
    observer: RefCell<Option<DialogObserver>>,
    log: LogSink,
}

impl TweakDialog {
    pub fn new(
        provider: Arc<dyn TweakProvider>,
        items: Vec<TweakItem>,
        completion: CompletionFlag,
        log: LogSink,
    ) -> Self {
        Self {
            inner: Rc::new(DialogInner {
                provider,
                items: RefCell::new(items),
                controls_enabled: Cell::new(true),
                completion: RefCell::new(Some(completion)),
                observer: RefCell::new(None),
                log,
            }),
        }
    }

    /// Called after every change so a toolkit can re-render
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&TweakDialog) + 'static,
    {
        *self.inner.observer.borrow_mut() = Some(Box::new(observer));
        self.notify();
    }

    pub fn items(&self) -> Vec<TweakItem> {
        self.inner.items.borrow().clone()
    }

    pub fn provider(&self) -> Arc<dyn TweakProvider> {
        Arc::clone(&self.inner.provider)
    }

    pub fn controls_enabled(&self) -> bool {
        self.inner.controls_enabled.get()
    }

    /// Enable or disable every checkbox and the apply button
    pub fn set_controls_enabled(&self, enabled: bool) {
        self.inner.controls_enabled.set(enabled);
        self.notify();
    }

    /// Stage a change and re-read the list so the dialog shows committed state
    ///
    /// Runs the device call synchronously on the UI thread. Failures go to the
    /// log and the list is refreshed anyway.
    pub fn toggle(&self, id: TweakId, enabled: bool) {
        if let Err(e) = self.inner.provider.set_enabled(id, enabled) {
            tracing::warn!("Failed to set tweak {} to {}: {:#}", id, enabled, e);
            self.inner.log.writeln(&format!("{e:?}"));
        }
        self.refresh();
    }

    /// Re-query the tweak list
    pub fn refresh(&self) {
        match self.inner.provider.list_items() {
            Ok(items) => *self.inner.items.borrow_mut() = items,
            Err(e) => {
                tracing::warn!("Failed to refresh tweak list: {:#}", e);
                self.inner.log.writeln(&format!("{e:?}"));
            }
        }
        self.notify();
    }

    /// Set the completion flag. Returns `false` if already dismissed.
    pub fn dismiss(&self, dismissal: Dismissal) -> bool {
        let flag = self.inner.completion.borrow_mut().take();
        match flag {
            Some(flag) => {
                tracing::debug!("Tweak dialog dismissed: {:?}", dismissal);
                flag.set(dismissal);
                true
            }
            None => false,
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.inner.completion.borrow().is_none()
    }

    fn notify(&self) {
        if let Some(observer) = self.inner.observer.borrow().as_ref() {
            observer(self);
        }
    }
}

/// Result of an interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The platform had no tweaks; no dialog was shown
    NoContent,
    /// A dialog was shown and closed
    Dismissed(Dismissal),
}

/// Runs tweak sessions on a worker thread
pub struct InteractiveSession<U> {
    scheduler: UiScheduler<U>,
    log: LogSink,
    metrics: Arc<Metrics>,
}

impl<U> Clone for InteractiveSession<U> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            log: self.log.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<U: DialogHost> InteractiveSession<U> {
    pub fn new(ctx: &TaskContext<U>) -> Self {
        Self {
            scheduler: ctx.scheduler.clone(),
            log: ctx.log.clone(),
            metrics: Arc::clone(&ctx.metrics),
        }
    }

    /// Run one session. Worker thread only; blocks until the dialog closes.
    ///
    /// Once `start` succeeds, `stop` is called exactly once on every path,
    /// after the dialog (if any) has been dismissed.
    pub fn run(
        &self,
        backend: &dyn PlatformBackend,
        provider: Arc<dyn TweakProvider>,
    ) -> Result<SessionOutcome> {
        debug_assert!(
            !self.scheduler.is_ui_thread(),
            "interactive sessions block and must not run on the UI thread"
        );

        backend.start().context("Failed to start platform backend")?;
        let backend = StopGuard::new(backend, &self.log);

        let items = provider
            .list_items()
            .context("Failed to read the tweak list")?;

        if items.is_empty() {
            tracing::info!("Platform has no tweaks - skipping dialog");
            backend.stop()?;
            return Ok(SessionOutcome::NoContent);
        }

        tracing::info!("Opening tweak dialog with {} items", items.len());
        self.metrics.record_session_opened();

        let (flag, waiter) = completion_flag();
        let log = self.log.clone();
        let queued = self.scheduler.enqueue(move |ui: &U| {
            ui.show_tweak_dialog(TweakDialog::new(provider, items, flag, log));
        });
        if !queued {
            tracing::warn!("UI closed before the tweak dialog could open");
        }

        let dismissal = waiter.wait();
        tracing::info!("Tweak dialog closed: {:?}", dismissal);

        backend.stop()?;
        Ok(SessionOutcome::Dismissed(dismissal))
    }
}

/// Stops the backend exactly once: explicitly, or on drop for early returns
struct StopGuard<'a> {
    backend: &'a dyn PlatformBackend,
    log: &'a LogSink,
    stopped: Cell<bool>,
}

impl<'a> StopGuard<'a> {
    fn new(backend: &'a dyn PlatformBackend, log: &'a LogSink) -> Self {
        Self {
            backend,
            log,
            stopped: Cell::new(false),
        }
    }

    fn stop(&self) -> Result<()> {
        if self.stopped.replace(true) {
            return Ok(());
        }
        self.backend
            .stop()
            .context("Failed to stop platform backend")
    }
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("{:#}", e);
            self.log.writeln(&format!("{e:?}"));
        }
    }
}
