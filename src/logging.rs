//! In-memory log sink.
//!
//! Nothing may be printed while the TUI owns the terminal, so log records
//! are kept in a bounded buffer and printed after the screen is restored.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::constants::LOG_BUFFER_CAPACITY;

/// Bounded, append-only log buffer. Oldest lines go first when full.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
    errors: AtomicBool,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
            errors: AtomicBool::new(false),
        }
    }

    pub fn push(&self, level: Level, line: String) {
        if level == Level::Error {
            self.errors.store(true, Ordering::SeqCst);
        }
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// True once anything was logged at ERROR level, even if the line has
    /// since been evicted.
    pub fn has_errors(&self) -> bool {
        self.errors.load(Ordering::SeqCst)
    }

    /// Take all buffered lines, newline terminated.
    pub fn drain_to_string(&self) -> String {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();
        for line in lines.drain(..) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

impl Log for LogBuffer {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {:<5} {}: {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        self.push(record.level(), line);
    }

    fn flush(&self) {}
}

static LOG_BUFFER: OnceLock<LogBuffer> = OnceLock::new();

/// The process-wide buffer behind the `log` macros.
pub fn buffer() -> &'static LogBuffer {
    LOG_BUFFER.get_or_init(|| LogBuffer::new(LOG_BUFFER_CAPACITY))
}

/// Route the `log` macros into [`buffer`].
pub fn init(debug: bool) -> Result<(), SetLoggerError> {
    log::set_logger(buffer())?;
    set_debug(debug);
    Ok(())
}

/// With `debug` set, DEBUG lines are kept too.
pub fn set_debug(debug: bool) {
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}
