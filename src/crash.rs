//! Panic logging, crash-contained worker threads and the crash report.

use std::any::Any;
use std::backtrace::Backtrace;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use crate::app::Event;

/// Log every panic at ERROR level, which also makes the exit path print
/// the crash report. Nothing is printed directly since the screen may be in
/// raw mode when this runs.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let current = thread::current();
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!(
            "Thread '{}' panicked at {}: {}\n{}",
            current.name().unwrap_or("<unnamed>"),
            location,
            payload_message(info.payload()),
            Backtrace::force_capture()
        );
    }));
}

pub fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

/// Run `f` on a thread called `name`. If it panics the crash is logged and
/// the UI loop is told through `events`, so it can restore the screen and
/// exit.
pub fn spawn_worker<F>(name: &str, events: mpsc::Sender<Event>, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let worker = name.to_string();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            log::error!("{} worker crashed", worker);
            // the UI loop may already be gone
            let _ = events.blocking_send(Event::WorkerCrashed(worker));
        }
    })
}

/// Build the report printed to stderr when errors were logged.
pub fn crash_report(logs: &str) -> String {
    let cpus = thread::available_parallelism().map_or(0, |n| n.get());
    let mut report = String::new();
    report.push_str("vvv ftop crashed vvv\n\n");
    report.push_str(&format!("ftop version: {}\n", env!("CARGO_PKG_VERSION")));
    report.push_str(&format!("OS          : {}\n", std::env::consts::OS));
    report.push_str(&format!("Architecture: {}\n", std::env::consts::ARCH));
    report.push_str("Compiler    : rustc\n");
    report.push_str(&format!("CPUs        : {}\n\n", cpus));
    report.push_str(logs);
    if !logs.is_empty() && !logs.ends_with('\n') {
        report.push('\n');
    }
    report.push_str("^^^ ftop crashed ^^^\n");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_bracketed() {
        let report = crash_report("12:00:00.000 ERROR ftop: boom\n");
        assert!(report.starts_with("vvv ftop crashed vvv\n"));
        assert!(report.ends_with("ERROR ftop: boom\n^^^ ftop crashed ^^^\n"));
        assert!(report.contains(&format!("ftop version: {}", env!("CARGO_PKG_VERSION"))));
        assert!(report.contains(&format!("OS          : {}", std::env::consts::OS)));
        assert!(report.contains("Compiler    : rustc"));
    }

    #[test]
    fn report_terminates_unterminated_logs() {
        let report = crash_report("no newline");
        assert!(report.ends_with("no newline\n^^^ ftop crashed ^^^\n"));
    }

    #[test]
    fn payload_messages() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(payload_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(payload_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(payload_message(s.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn crashing_worker_is_reported() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_worker("doomed", tx, || panic!("on purpose")).unwrap();
        handle.join().unwrap();
        match rx.blocking_recv() {
            Some(Event::WorkerCrashed(name)) => assert_eq!(name, "doomed"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn finished_worker_is_quiet() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = spawn_worker("fine", tx, || {}).unwrap();
        handle.join().unwrap();
        // the sender was dropped without sending
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn workers_are_named() {
        let (tx, _rx) = mpsc::channel(1);
        let (name_tx, name_rx) = std::sync::mpsc::channel();
        spawn_worker("named", tx, move || {
            let _ = name_tx.send(thread::current().name().map(String::from));
        })
        .unwrap()
        .join()
        .unwrap();
        assert_eq!(name_rx.recv().unwrap().as_deref(), Some("named"));
    }
}
