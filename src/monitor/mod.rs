//! Sampling the OS: process table, system overview and I/O counters.

pub mod dedup;
pub mod io_tracker;
pub mod launch_tree;
pub mod tracker;

#[cfg_attr(target_os = "linux", allow(dead_code))]
pub mod darwin;
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub mod procfs;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{Process, SystemOverview};

pub use io_tracker::IoTracker;
pub use launch_tree::LaunchNode;
pub use tracker::ProcessTracker;

/// Monotonically increasing byte counters keyed by label, e.g. `eth0 in`.
pub type IoCounters = BTreeMap<String, u64>;

/// A failed OS read. Always recoverable: the sampler logs it and keeps the
/// previous data.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("running {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    Exit { command: String, status: String },
    #[error("parse error: {0}")]
    Parse(String),
}

impl SourceError {
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        SourceError::Read {
            path: path.into(),
            source,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        SourceError::Parse(message.into())
    }
}

/// Where process lists come from.
pub trait ProcessSource: Send {
    fn processes(&mut self) -> Result<Vec<Process>, SourceError>;
    fn overview(&mut self) -> Result<SystemOverview, SourceError>;
}

/// Where I/O byte counters come from.
pub trait IoSource: Send {
    fn counters(&mut self) -> Result<IoCounters, SourceError>;
}

/// The process source for the platform we are running on.
pub fn process_source() -> Box<dyn ProcessSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(procfs::ProcfsSource::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(darwin::PsSource::new())
    }
}

/// The I/O counter source for the platform we are running on.
pub fn io_source() -> Box<dyn IoSource> {
    #[cfg(target_os = "linux")]
    {
        Box::new(procfs::ProcfsIoSource)
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(darwin::CommandIoSource)
    }
}
