use super::task::TaskState;
use thiserror::Error;

/// Errors raised by the engine itself (never by task bodies, which report
/// their own failures through the log sink).
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Task '{task}' must be started from the UI thread")]
    NotOnUiThread { task: &'static str },

    #[error("Task '{task}' is already in progress ({state:?})")]
    AlreadyRunning { task: &'static str, state: TaskState },

    #[error("Failed to spawn worker thread for task '{task}'")]
    SpawnFailed {
        task: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Event loop belongs to another thread")]
    WrongThread,
}
