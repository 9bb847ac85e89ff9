use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

/// Identifies one OS process across samples. PIDs get reused, so the start
/// time is part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId {
    pub pid: u32,
    pub start_time: SystemTime,
}

/// A single process as seen in one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub pid: u32,
    pub ppid: Option<u32>,
    /// Index of the parent inside the owning [`Snapshot`]. Only meaningful
    /// for processes handed out by a snapshot.
    pub parent_ix: Option<usize>,
    pub start_time: SystemTime,

    pub cmdline: String,
    pub command: String,
    pub lowercase_command: String,
    pub username: String,

    pub rss_kb: u64,
    pub cpu_time: Option<Duration>,

    /// Number of children that died recently, see `NATIVITY_MAX_AGE`.
    pub nativity: usize,
    pub deduplication_suffix: String,
    pub dead_children_birth_times: BTreeSet<SystemTime>,
}

impl Process {
    pub fn new(
        pid: u32,
        ppid: Option<u32>,
        start_time: SystemTime,
        cmdline: &str,
        username: &str,
        rss_kb: u64,
        cpu_time: Option<Duration>,
    ) -> Self {
        let command = parse_command(cmdline);
        Self {
            pid,
            ppid,
            parent_ix: None,
            start_time,
            cmdline: cmdline.to_string(),
            lowercase_command: command.to_lowercase(),
            command,
            username: username.to_string(),
            rss_kb,
            cpu_time,
            nativity: 0,
            deduplication_suffix: String::new(),
            dead_children_birth_times: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ProcessId {
        ProcessId {
            pid: self.pid,
            start_time: self.start_time,
        }
    }

    /// Same OS process as `other`, possibly sampled at another time.
    pub fn same_as(&self, other: &Process) -> bool {
        self.pid == other.pid && self.start_time == other.start_time
    }

    /// True if the OS is showing a placeholder instead of the real name,
    /// which happens while a process is exiting.
    pub fn is_dying(&self) -> bool {
        is_dying_name(&self.cmdline) || is_dying_name(&self.command)
    }

    /// Filter matching: the raw cmdline, case-insensitive cmdline, command or
    /// username, or the PID as text.
    pub fn matches(&self, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        if self.cmdline.contains(filter) {
            return true;
        }

        let lowercase_filter = filter.to_lowercase();
        if self.cmdline.to_lowercase().contains(&lowercase_filter)
            || self.lowercase_command.contains(&lowercase_filter)
            || self.username.to_lowercase().contains(&lowercase_filter)
        {
            return true;
        }

        self.pid.to_string().contains(filter)
    }

    /// CPU time as a plain duration, missing values count as zero.
    pub fn cpu_time_or_zero(&self) -> Duration {
        self.cpu_time.unwrap_or_default()
    }
}

fn is_dying_name(name: &str) -> bool {
    let name = name.trim();
    if name == "<defunct>" || name == "<exiting>" {
        return true;
    }
    name.len() > 2 && name.starts_with('(') && name.ends_with(')')
}

/// Programs that run a script named by one of their arguments.
const INTERPRETERS: &[&str] = &["sh", "bash", "zsh", "dash", "fish", "env", "node"];
const VERSIONED_INTERPRETERS: &[&str] = &["python", "ruby", "perl"];

fn is_interpreter(name: &str) -> bool {
    if INTERPRETERS.contains(&name) {
        return true;
    }
    VERSIONED_INTERPRETERS.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit() || c == '.'))
    })
}

fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Turn a raw command line into the name shown in the process table.
pub fn parse_command(cmdline: &str) -> String {
    let cmdline = cmdline.trim();
    if cmdline.is_empty() {
        return String::new();
    }
    if is_dying_name(cmdline) {
        return cmdline.to_string();
    }

    let mut words = cmdline.split_whitespace();
    let Some(argv0) = words.next() else {
        return String::new();
    };
    let program = basename(argv0).trim_start_matches('-');

    if is_interpreter(program) {
        if let Some(script) = words.find(|w| !w.starts_with('-') && !w.contains('=')) {
            let script = basename(script);
            if !script.is_empty() {
                return script.to_string();
            }
        }
    }

    if program.is_empty() {
        argv0.to_string()
    } else {
        program.to_string()
    }
}
