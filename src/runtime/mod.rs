//! Task-execution and UI synchronization engine.
//!
//! Every widget mutation happens on the single UI thread. Blocking device work
//! runs on dedicated worker threads. The pieces:
//!
//! - [`UiScheduler`] / [`EventLoop`]: the only way for another thread to touch
//!   UI state is to enqueue a callback that the UI thread runs later.
//! - [`BackgroundTask`]: the `before` / `body` / `after` lifecycle binding a
//!   view to one worker thread per run.
//! - [`LogSink`]: output capture forwarding text to the log pane from any thread.
//! - [`InteractiveSession`]: lets a worker hand control to a modal dialog and
//!   block until the user dismisses it.
//!
//! The engine is toolkit-agnostic: the view type `U` is whatever the UI layer
//! uses (a Slint window wrapper in the binary, [`crate::ui::HeadlessView`] in
//! tests). Callbacks receive `&U` and must be `Send`; `U` itself never has to be.

pub mod error;
pub mod log_sink;
pub mod scheduler;
pub mod session;
pub mod task;

pub use error::RuntimeError;
pub use log_sink::{LogSink, LogView};
pub use scheduler::{CallbackQueue, EventLoop, UiCallback, UiScheduler};
pub use session::{
    CompletionFlag, CompletionWaiter, DialogHost, Dismissal, InteractiveSession, SessionOutcome,
    TweakDialog, TweakMessage, completion_flag,
};
pub use task::{BackgroundTask, Task, TaskContext, TaskState, Workers};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Task bodies may panic on worker threads; the state they share with the UI
/// thread stays meaningful, so poisoning is not treated as fatal.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
