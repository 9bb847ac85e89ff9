//! Application-wide constants.
//!
//! Centralizes timing, layout thresholds and other magic numbers.

use std::path::PathBuf;
use std::time::Duration;

// ── Timing ────────────────────────────────────────────────────────
/// Interval between process table samples.
pub const PROCESS_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
/// Interval between I/O counter samples.
pub const IO_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
/// How long a dead child keeps counting towards its parent's nativity.
pub const NATIVITY_MAX_AGE: Duration = Duration::from_secs(10);

// ── Channels ──────────────────────────────────────────────────────
/// Capacity of the UI event channel. Producers wait when it is full.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ── Logging ───────────────────────────────────────────────────────
/// Maximum number of log lines kept for the exit report.
pub const LOG_BUFFER_CAPACITY: usize = 1000;

// ── Layout ────────────────────────────────────────────────────────
/// Height of the overview row, borders included.
pub const OVERVIEW_HEIGHT: u16 = 5;
/// Width of the overview boxes when the IO column is shown.
pub const OVERVIEW_MIN_WIDTH: u16 = 64;
/// Width of the IO top-list column, borders included.
pub const IO_COLUMN_WIDTH: u16 = 25;
/// Smallest process area height before the launch tree is dropped.
pub const MIN_PROCESSES_HEIGHT: u16 = 6;
/// Below this many columns only the "make terminal larger" message is shown.
pub const MIN_TERMINAL_WIDTH: u16 = 50;
/// Below this many rows only the "make terminal larger" message is shown.
pub const MIN_TERMINAL_HEIGHT: u16 = 11;
/// Number of rows promoted to the top by raw CPU time after scoring.
pub const TOP_CPU_ROWS: usize = 3;

// ── Kill modal ────────────────────────────────────────────────────
/// Kill confirmation popup width.
pub const KILL_POPUP_WIDTH: u16 = 44;
/// Kill confirmation popup height.
pub const KILL_POPUP_HEIGHT: u16 = 6;

// ── OS probes ─────────────────────────────────────────────────────
/// Disk sector size (bytes) for /proc/diskstats.
pub const SECTOR_SIZE_BYTES: u64 = 512;
/// Minimum fields expected in a /proc/diskstats line.
pub const MIN_DISKSTATS_FIELDS: usize = 14;
/// `PF_KTHREAD` in the flags field of /proc/<pid>/stat.
pub const PF_KTHREAD: u64 = 0x0020_0000;

// ── Profiling ─────────────────────────────────────────────────────
/// Render timings written by `--profile`.
pub const PROFILE_FILE_NAME: &str = "ftop-profile.txt";
/// CPU flamegraph written by `--profile`.
pub const CPU_PROFILE_FILE_NAME: &str = "ftop-cpu.svg";
/// Heap profile written by `--profile` in `dhat-heap` builds.
pub const HEAP_PROFILE_FILE_NAME: &str = "ftop-heap.json";
/// CPU samples per second.
pub const CPU_PROFILE_FREQUENCY: i32 = 100;

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to /tmp.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Returns `~/.config/ftop/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("ftop")
}

/// Returns `~/.config/ftop/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
