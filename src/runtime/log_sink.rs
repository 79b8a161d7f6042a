// LogSink - output capture for the log pane
//
// Any thread may write text. Each write is passed through synchronously to the
// original stream (console) and forwarded to the UI log as a scheduled append,
// so the log widget is only ever mutated on the UI thread.

use super::lock;
use super::scheduler::UiScheduler;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, RwLock};

/// A view with a log pane
pub trait LogView {
    /// Append text verbatim (no newline added). UI thread only.
    fn append_log(&self, text: &str);
}

type AppendFn = Arc<dyn Fn(String) + Send + Sync>;

/// Cloneable, thread-safe writer feeding the UI log pane
///
/// One instance is created at UI start, [attached](Self::attach) to the
/// scheduler, handed to every component that produces diagnostic text, and
/// [detached](Self::detach) at teardown.
///
/// Writes issued from one thread reach the log in the order they were issued;
/// writes from different threads interleave in enqueue order.
///
/// # Example
/// ```ignore
/// let log = LogSink::with_passthrough(std::io::stderr());
/// log.attach(&event_loop.scheduler());
/// log.writeln("Looking for Sony devices");
/// ```
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Inner>,
}

struct Inner {
    passthrough: Mutex<Option<Box<dyn Write + Send>>>,
    target: RwLock<Option<AppendFn>>,
    /// Trailing bytes of an unfinished UTF-8 sequence from `io::Write`
    pending: Mutex<Vec<u8>>,
}

impl LogSink {
    /// A sink without console pass-through
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                passthrough: Mutex::new(None),
                target: RwLock::new(None),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A sink that also copies every write to `stream`
    pub fn with_passthrough<W>(stream: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let sink = Self::new();
        *lock(&sink.inner.passthrough) = Some(Box::new(stream));
        sink
    }

    /// Start forwarding writes to the view's log pane through `scheduler`
    pub fn attach<U>(&self, scheduler: &UiScheduler<U>)
    where
        U: LogView + 'static,
    {
        let scheduler = scheduler.clone();
        let append: AppendFn = Arc::new(move |text: String| {
            scheduler.enqueue(move |ui: &U| ui.append_log(&text));
        });

        *self
            .inner
            .target
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(append);
        tracing::debug!("Log sink attached to UI");
    }

    /// Stop forwarding to the UI; pass-through continues
    pub fn detach(&self) {
        let previous = self
            .inner
            .target
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::debug!("Log sink detached from UI");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner
            .target
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }

    /// Write text verbatim
    pub fn write(&self, text: &str) {
        self.dispatch(text.to_owned());
    }

    /// Write text followed by a newline
    pub fn writeln(&self, text: &str) {
        self.dispatch(format!("{text}\n"));
    }

    /// Flush the pass-through stream only
    pub fn flush(&self) -> io::Result<()> {
        match lock(&self.inner.passthrough).as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }

    fn dispatch(&self, text: String) {
        if text.is_empty() {
            return;
        }

        if let Some(stream) = lock(&self.inner.passthrough).as_mut() {
            // Console failures must not stop the UI copy
            let _ = stream.write_all(text.as_bytes());
        }

        let target = self
            .inner
            .target
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(append) = target {
            append(text);
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl Write for LogSink {
    /// Byte writes may split a character; the unfinished tail is held back
    /// until the next write completes it.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pending = lock(&self.inner.pending);
        pending.extend_from_slice(buf);

        let complete = pending.len() - incomplete_tail(&pending);
        let tail = pending.split_off(complete);
        let text = String::from_utf8_lossy(&pending).into_owned();
        *pending = tail;

        // Dispatch under the lock so byte writes keep their order
        self.dispatch(text);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        LogSink::flush(self)
    }
}

/// Length of an unfinished multi-byte sequence at the end of `bytes`
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::EventLoop;
    use std::cell::RefCell;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Pane {
        text: RefCell<String>,
    }

    impl LogView for Pane {
        fn append_log(&self, text: &str) {
            self.text.borrow_mut().push_str(text);
        }
    }

    /// Shared buffer standing in for stdout
    #[derive(Clone, Default)]
    struct Console(Arc<Mutex<Vec<u8>>>);

    impl Write for Console {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_reach_pane_and_console() {
        let mut event_loop = EventLoop::new(Pane::default());
        let console = Console::default();
        let log = LogSink::with_passthrough(console.clone());
        log.attach(&event_loop.scheduler());

        log.writeln("hello");
        log.write("partial");

        // Console copy is synchronous
        assert_eq!(console.0.lock().unwrap().as_slice(), b"hello\npartial");
        // UI copy waits for the event loop
        assert!(event_loop.view().text.borrow().is_empty());

        event_loop.run_pending().unwrap();
        assert_eq!(*event_loop.view().text.borrow(), "hello\npartial");
    }

    #[test]
    fn test_same_thread_order_preserved() {
        let mut event_loop = EventLoop::new(Pane::default());
        let log = LogSink::new();
        log.attach(&event_loop.scheduler());

        let worker_log = log.clone();
        thread::spawn(move || {
            worker_log.write("A");
            worker_log.write("B");
        })
        .join()
        .unwrap();

        assert!(
            event_loop
                .run_until(|pane| pane.text.borrow().len() == 2, Duration::from_secs(5))
                .unwrap()
        );
        assert_eq!(*event_loop.view().text.borrow(), "AB");
    }

    #[test]
    fn test_detached_sink_only_passes_through() {
        let mut event_loop = EventLoop::new(Pane::default());
        let console = Console::default();
        let log = LogSink::with_passthrough(console.clone());
        log.attach(&event_loop.scheduler());
        assert!(log.is_attached());

        log.detach();
        assert!(!log.is_attached());
        log.writeln("after detach");

        assert_eq!(event_loop.run_pending().unwrap(), 0);
        assert!(event_loop.view().text.borrow().is_empty());
        assert_eq!(console.0.lock().unwrap().as_slice(), b"after detach\n");
    }

    #[test]
    fn test_io_write_formatting() {
        let mut event_loop = EventLoop::new(Pane::default());
        let mut log = LogSink::new();
        log.attach(&event_loop.scheduler());

        writeln!(log, "{} of {}", 3, 4).unwrap();
        Write::flush(&mut log).unwrap();

        event_loop.run_pending().unwrap();
        assert_eq!(*event_loop.view().text.borrow(), "3 of 4\n");
    }

    #[test]
    fn test_io_write_joins_split_characters() {
        let mut event_loop = EventLoop::new(Pane::default());
        let mut log = LogSink::new();
        log.attach(&event_loop.scheduler());

        let bytes = "应用\n".as_bytes();
        log.write_all(&bytes[..2]).unwrap();
        log.write_all(&bytes[2..4]).unwrap();
        log.write_all(&bytes[4..]).unwrap();

        event_loop.run_pending().unwrap();
        assert_eq!(*event_loop.view().text.borrow(), "应用\n");
    }

    #[test]
    fn test_io_write_replaces_invalid_bytes() {
        let mut event_loop = EventLoop::new(Pane::default());
        let mut log = LogSink::new();
        log.attach(&event_loop.scheduler());

        log.write_all(b"bad \xFF byte\n").unwrap();

        event_loop.run_pending().unwrap();
        assert_eq!(*event_loop.view().text.borrow(), "bad \u{FFFD} byte\n");
    }

    #[test]
    fn test_incomplete_tail() {
        let text = "a€".as_bytes();
        assert_eq!(incomplete_tail(text), 0);
        assert_eq!(incomplete_tail(&text[..2]), 1);
        assert_eq!(incomplete_tail(&text[..3]), 2);
        assert_eq!(incomplete_tail(b""), 0);
        assert_eq!(incomplete_tail(b"\xFF"), 0);
    }

    #[test]
    fn test_write_after_ui_shutdown_is_harmless() {
        let event_loop = EventLoop::new(Pane::default());
        let log = LogSink::new();
        log.attach(&event_loop.scheduler());

        let pane = event_loop.shutdown();
        log.writeln("nobody is listening");

        assert!(pane.text.borrow().is_empty());
    }
}
