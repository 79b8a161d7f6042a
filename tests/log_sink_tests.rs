//! Ordering tests for the log sink under concurrent writers
//!
//! These tests verify:
//! - Each writer thread's lines reach the log pane in issue order
//! - No line is lost or split when threads interleave
//! - Nothing reaches the pane after detach

use pmca_gui::runtime::{EventLoop, LogSink};
use pmca_gui::ui::HeadlessView;
use proptest::prelude::*;
use std::thread;

/// Write `counts[t]` numbered lines from thread `t`, then drain the queue
fn write_concurrently(counts: &[usize]) -> String {
    let mut event_loop = EventLoop::new(HeadlessView::new());
    let log = LogSink::new();
    log.attach(&event_loop.scheduler());

    thread::scope(|scope| {
        for (writer, &count) in counts.iter().enumerate() {
            let log = log.clone();
            scope.spawn(move || {
                for seq in 0..count {
                    log.writeln(&format!("w{writer}:{seq}"));
                }
            });
        }
    });

    event_loop.run_pending().unwrap();
    event_loop.view().log_text()
}

fn parse_line(line: &str) -> (usize, usize) {
    let (writer, seq) = line
        .strip_prefix('w')
        .and_then(|rest| rest.split_once(':'))
        .unwrap_or_else(|| panic!("malformed log line: {line:?}"));
    (writer.parse().unwrap(), seq.parse().unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_per_thread_order_preserved(counts in prop::collection::vec(0usize..60, 1..6)) {
        let text = write_concurrently(&counts);

        let mut next = vec![0usize; counts.len()];
        for line in text.lines() {
            let (writer, seq) = parse_line(line);
            prop_assert_eq!(seq, next[writer], "writer {} out of order", writer);
            next[writer] += 1;
        }
        prop_assert_eq!(next, counts);
    }
}

#[test]
fn test_writes_before_attach_are_not_shown() {
    let mut event_loop = EventLoop::new(HeadlessView::new());
    let log = LogSink::new();

    log.writeln("early");
    log.attach(&event_loop.scheduler());
    log.writeln("late");
    event_loop.run_pending().unwrap();

    assert_eq!(event_loop.view().log_text(), "late\n");
}

#[test]
fn test_detach_stops_forwarding() {
    let mut event_loop = EventLoop::new(HeadlessView::new());
    let log = LogSink::new();
    log.attach(&event_loop.scheduler());

    log.write("partial ");
    log.writeln("line");
    log.detach();
    log.writeln("after detach");
    event_loop.run_pending().unwrap();

    assert_eq!(event_loop.view().log_text(), "partial line\n");
    assert!(!log.is_attached());
}
