// BackgroundTask - before/body/after lifecycle over the UI scheduler
//
// before: UI thread, synchronous; snapshots what the body needs
// body:   dedicated worker thread; blocking device work
// after:  UI thread again, via the scheduler; always runs, with None on failure
//
// A body failure (error or panic) is written to the log sink and never
// propagates out of the worker thread.

use super::error::RuntimeError;
use super::lock;
use super::log_sink::LogSink;
use super::scheduler::UiScheduler;
use crate::metrics::Metrics;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A unit of work bound to a view type `U`
///
/// `before` and `after` receive the view and run on the UI thread. `body` runs
/// on a worker thread and must not touch the view; anything it needs from the
/// UI is captured by `before` and passed in as [`Arg`](Self::Arg).
pub trait Task<U>: Send + Sync + 'static {
    /// Snapshot taken on the UI thread and handed to the body
    type Arg: Send + 'static;

    /// Result handed from the body back to `after`
    type Output: Send + 'static;

    /// Short name used for the worker thread and in logs
    fn name(&self) -> &'static str;

    /// Prepare the UI (typically disable the triggering control) and capture
    /// inputs for the body
    fn before(&self, ui: &U) -> Self::Arg;

    fn body(&self, arg: Self::Arg) -> anyhow::Result<Self::Output>;

    /// Restore the UI. `None` if the body failed or panicked.
    fn after(&self, ui: &U, output: Option<Self::Output>);
}

/// Lifecycle position of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    BeforeRan,
    Running,
    AfterScheduled,
    Done,
}

impl TaskState {
    /// Whether a new run may start from this state
    pub fn can_start(self) -> bool {
        matches!(self, TaskState::Idle | TaskState::Done)
    }
}

/// Shared plumbing every task needs
pub struct TaskContext<U> {
    pub scheduler: UiScheduler<U>,
    pub log: LogSink,
    pub metrics: Arc<Metrics>,
    /// Every worker started through this context
    pub workers: Arc<Workers>,
}

// Manual Clone implementation to avoid requiring U: Clone
impl<U> Clone for TaskContext<U> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            log: self.log.clone(),
            metrics: Arc::clone(&self.metrics),
            workers: Arc::clone(&self.workers),
        }
    }
}

impl<U: 'static> TaskContext<U> {
    /// Build a context sharing the scheduler's metrics
    pub fn new(scheduler: UiScheduler<U>, log: LogSink) -> Self {
        let metrics = Arc::clone(scheduler.metrics());
        Self {
            scheduler,
            log,
            metrics,
            workers: Arc::new(Workers::default()),
        }
    }
}

/// Join handles of task workers, so shutdown can wait for them
#[derive(Default)]
pub struct Workers {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Workers {
    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = lock(&self.handles);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Workers that have not returned yet
    pub fn active(&self) -> usize {
        lock(&self.handles)
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait up to `timeout` for every worker to return
    ///
    /// Returns the number still running at the deadline.
    pub fn join_all(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let (finished, running): (Vec<_>, Vec<_>) = lock(&self.handles)
                .drain(..)
                .partition(|h| h.is_finished());
            let remaining = running.len();
            lock(&self.handles).extend(running);

            for handle in finished {
                if handle.join().is_err() {
                    tracing::warn!("Task worker panicked outside its body");
                }
            }

            if remaining == 0 || Instant::now() >= deadline {
                return remaining;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

/// A task plus its run state
///
/// One instance per UI action. [`run`](Self::run) is called from the UI thread
/// each time the action fires; a run that is still in flight rejects the next
/// one instead of spawning a second worker.
pub struct BackgroundTask<T, U> {
    task: Arc<T>,
    ctx: TaskContext<U>,
    state: Arc<Mutex<TaskState>>,
}

impl<T, U> BackgroundTask<T, U>
where
    T: Task<U>,
    U: 'static,
{
    pub fn new(task: T, ctx: TaskContext<U>) -> Self {
        Self {
            task: Arc::new(task),
            ctx,
            state: Arc::new(Mutex::new(TaskState::Idle)),
        }
    }

    pub fn state(&self) -> TaskState {
        *lock(&self.state)
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    /// Run `before` now, start `body` on a new worker thread and schedule
    /// `after` for when it finishes
    ///
    /// Returns as soon as the worker is started. Must be called on the UI
    /// thread.
    pub fn run(&self, ui: &U) -> Result<(), RuntimeError> {
        let name = self.task.name();

        if !self.ctx.scheduler.is_ui_thread() {
            return Err(RuntimeError::NotOnUiThread { task: name });
        }

        {
            let mut state = lock(&self.state);
            if !state.can_start() {
                return Err(RuntimeError::AlreadyRunning {
                    task: name,
                    state: *state,
                });
            }
            *state = TaskState::BeforeRan;
        }

        tracing::debug!(task = name, "Running before");
        let arg = match panic::catch_unwind(AssertUnwindSafe(|| self.task.before(ui))) {
            Ok(arg) => arg,
            Err(payload) => {
                // Leave the task startable; the panic is the caller's to handle
                *lock(&self.state) = TaskState::Idle;
                panic::resume_unwind(payload);
            }
        };

        *lock(&self.state) = TaskState::Running;

        let task = Arc::clone(&self.task);
        let ctx = self.ctx.clone();
        let state = Arc::clone(&self.state);

        let spawned = thread::Builder::new()
            .name(format!("task-{name}"))
            .spawn(move || {
                let output = execute_body(task.as_ref(), arg, &ctx);
                schedule_after(task, output, &ctx, state);
            });

        match spawned {
            Ok(handle) => {
                self.ctx.workers.track(handle);
                self.ctx.metrics.record_task_started();
                tracing::debug!(task = name, "Worker started");
                Ok(())
            }
            Err(source) => {
                // The argument went down with the closure; restore the UI anyway
                tracing::error!(task = name, "Failed to spawn worker: {}", source);
                self.ctx
                    .log
                    .writeln(&format!("Failed to start {name}: {source}"));
                schedule_after(
                    Arc::clone(&self.task),
                    None,
                    &self.ctx,
                    Arc::clone(&self.state),
                );
                Err(RuntimeError::SpawnFailed { task: name, source })
            }
        }
    }
}

/// Run the body, converting errors and panics into log output
fn execute_body<T, U>(task: &T, arg: T::Arg, ctx: &TaskContext<U>) -> Option<T::Output>
where
    T: Task<U>,
{
    let name = task.name();
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| task.body(arg)));
    ctx.metrics.record_body_time(started.elapsed());

    match result {
        Ok(Ok(output)) => {
            ctx.metrics.record_task_succeeded();
            tracing::debug!(task = name, elapsed = ?started.elapsed(), "Body finished");
            Some(output)
        }
        Ok(Err(e)) => {
            ctx.metrics.record_task_failed();
            tracing::warn!(task = name, "Body failed: {:#}", e);
            // Debug formatting includes the whole cause chain
            ctx.log.writeln(&format!("{e:?}"));
            None
        }
        Err(payload) => {
            ctx.metrics.record_task_panicked();
            let message = panic_message(payload.as_ref());
            tracing::error!(task = name, "Body panicked: {}", message);
            ctx.log.writeln(&format!("Unexpected error in {name}: {message}"));
            None
        }
    }
}

fn schedule_after<T, U>(
    task: Arc<T>,
    output: Option<T::Output>,
    ctx: &TaskContext<U>,
    state: Arc<Mutex<TaskState>>,
) where
    T: Task<U>,
    U: 'static,
{
    *lock(&state) = TaskState::AfterScheduled;

    let after_state = Arc::clone(&state);
    let queued = ctx.scheduler.enqueue(move |ui: &U| {
        task.after(ui, output);
        *lock(&after_state) = TaskState::Done;
    });

    if !queued {
        // UI is gone; nothing left to restore
        *lock(&state) = TaskState::Done;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{EventLoop, LogView};
    use anyhow::bail;
    use std::cell::{Cell, RefCell};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Default)]
    struct View {
        button_enabled: Cell<bool>,
        log: RefCell<String>,
        results: RefCell<Vec<Option<u32>>>,
    }

    impl LogView for View {
        fn append_log(&self, text: &str) {
            self.log.borrow_mut().push_str(text);
        }
    }

    enum Behaviour {
        Succeed(u32),
        Fail,
        Panic,
    }

    struct Scripted {
        behaviour: Behaviour,
        gate: Option<Mutex<mpsc::Receiver<()>>>,
    }

    impl Scripted {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                gate: None,
            }
        }

        fn gated(behaviour: Behaviour) -> (Self, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            (
                Self {
                    behaviour,
                    gate: Some(Mutex::new(rx)),
                },
                tx,
            )
        }
    }

    impl Task<View> for Scripted {
        type Arg = u32;
        type Output = u32;

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn before(&self, ui: &View) -> u32 {
            ui.button_enabled.set(false);
            10
        }

        fn body(&self, arg: u32) -> anyhow::Result<u32> {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            match self.behaviour {
                Behaviour::Succeed(n) => Ok(arg + n),
                Behaviour::Fail => bail!("device went away"),
                Behaviour::Panic => panic!("body exploded"),
            }
        }

        fn after(&self, ui: &View, output: Option<u32>) {
            ui.results.borrow_mut().push(output);
            ui.button_enabled.set(true);
        }
    }

    fn setup(scripted: Scripted) -> (EventLoop<View>, BackgroundTask<Scripted, View>) {
        let event_loop = EventLoop::new(View {
            button_enabled: Cell::new(true),
            ..Default::default()
        });
        let log = LogSink::new();
        log.attach(&event_loop.scheduler());
        let task = BackgroundTask::new(scripted, TaskContext::new(event_loop.scheduler(), log));
        (event_loop, task)
    }

    fn wait_done(event_loop: &mut EventLoop<View>, task: &BackgroundTask<Scripted, View>) {
        assert!(
            event_loop
                .run_until(|_| task.state() == TaskState::Done, Duration::from_secs(5))
                .unwrap()
        );
        // Drain any log appends queued behind `after`
        event_loop.run_pending().unwrap();
    }

    #[test]
    fn test_success_passes_output_to_after() {
        let (mut event_loop, task) = setup(Scripted::new(Behaviour::Succeed(5)));

        task.run(event_loop.view()).unwrap();
        assert!(!event_loop.view().button_enabled.get());

        wait_done(&mut event_loop, &task);

        let view = event_loop.view();
        assert_eq!(*view.results.borrow(), vec![Some(15)]);
        assert!(view.button_enabled.get());
        assert!(view.log.borrow().is_empty());
    }

    #[test]
    fn test_failure_is_logged_and_after_gets_none() {
        let (mut event_loop, task) = setup(Scripted::new(Behaviour::Fail));

        task.run(event_loop.view()).unwrap();
        wait_done(&mut event_loop, &task);

        let view = event_loop.view();
        assert_eq!(*view.results.borrow(), vec![None]);
        assert!(view.button_enabled.get());
        assert!(view.log.borrow().contains("device went away"));
        assert_eq!(task.ctx.metrics.tasks_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_panic_is_contained() {
        let (mut event_loop, task) = setup(Scripted::new(Behaviour::Panic));

        task.run(event_loop.view()).unwrap();
        wait_done(&mut event_loop, &task);

        let view = event_loop.view();
        assert_eq!(*view.results.borrow(), vec![None]);
        assert!(view.log.borrow().contains("body exploded"));
        assert_eq!(task.ctx.metrics.tasks_panicked.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_second_run_rejected_while_in_flight() {
        let (scripted, release) = Scripted::gated(Behaviour::Succeed(1));
        let (mut event_loop, task) = setup(scripted);

        task.run(event_loop.view()).unwrap();
        assert_eq!(task.state(), TaskState::Running);

        let err = task.run(event_loop.view()).unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyRunning { task: "scripted", .. }));

        release.send(()).unwrap();
        wait_done(&mut event_loop, &task);
        assert_eq!(*event_loop.view().results.borrow(), vec![Some(11)]);

        // Done is a valid start state again
        release.send(()).unwrap();
        task.run(event_loop.view()).unwrap();
        wait_done(&mut event_loop, &task);
        assert_eq!(event_loop.view().results.borrow().len(), 2);
    }

    #[test]
    fn test_run_off_ui_thread_rejected() {
        let (event_loop, task) = setup(Scripted::new(Behaviour::Succeed(1)));

        let err = thread::scope(|s| s.spawn(|| task.run(&View::default())).join().unwrap());
        assert!(matches!(err, Err(RuntimeError::NotOnUiThread { .. })));
        assert_eq!(task.state(), TaskState::Idle);
        assert!(event_loop.view().results.borrow().is_empty());
    }

    #[test]
    fn test_after_dropped_when_ui_gone() {
        let (scripted, release) = Scripted::gated(Behaviour::Succeed(1));
        let (event_loop, task) = setup(scripted);

        task.run(event_loop.view()).unwrap();
        let view = event_loop.shutdown();
        release.send(()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while task.state() != TaskState::Done && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(task.state(), TaskState::Done);
        assert!(view.results.borrow().is_empty());
    }

    #[test]
    fn test_shutdown_waits_for_workers() {
        let (scripted, release) = Scripted::gated(Behaviour::Succeed(1));
        let (event_loop, task) = setup(scripted);

        task.run(event_loop.view()).unwrap();
        let workers = Arc::clone(&task.ctx.workers);
        assert_eq!(workers.join_all(Duration::from_millis(20)), 1);
        assert_eq!(workers.active(), 1);

        let _view = event_loop.shutdown();
        release.send(()).unwrap();

        assert_eq!(workers.join_all(Duration::from_secs(5)), 0);
        assert_eq!(workers.active(), 0);
        assert_eq!(task.state(), TaskState::Done);
    }

    /// Panics in `before` on the first run only
    struct FragileBefore {
        panicked: AtomicBool,
    }

    impl Task<View> for FragileBefore {
        type Arg = ();
        type Output = ();

        fn name(&self) -> &'static str {
            "fragile"
        }

        fn before(&self, _: &View) {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("before failed");
            }
        }

        fn body(&self, _: ()) -> anyhow::Result<()> {
            Ok(())
        }

        fn after(&self, ui: &View, _: Option<()>) {
            ui.button_enabled.set(true);
        }
    }

    #[test]
    fn test_panic_in_before_leaves_task_startable() {
        let mut event_loop = EventLoop::new(View::default());
        let task = BackgroundTask::new(
            FragileBefore {
                panicked: AtomicBool::new(false),
            },
            TaskContext::new(event_loop.scheduler(), LogSink::new()),
        );

        let first = panic::catch_unwind(AssertUnwindSafe(|| task.run(event_loop.view())));
        assert!(first.is_err());
        assert_eq!(task.state(), TaskState::Idle);

        task.run(event_loop.view()).unwrap();
        assert!(
            event_loop
                .run_until(|_| task.state() == TaskState::Done, Duration::from_secs(5))
                .unwrap()
        );
        assert!(event_loop.view().button_enabled.get());
    }

    #[test]
    fn test_state_machine_start_states() {
        assert!(TaskState::Idle.can_start());
        assert!(TaskState::Done.can_start());
        assert!(!TaskState::BeforeRan.can_start());
        assert!(!TaskState::Running.can_start());
        assert!(!TaskState::AfterScheduled.can_start());
    }
}
