//! Linux process and I/O sampling straight from `/proc`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::constants::{MIN_DISKSTATS_FIELDS, PF_KTHREAD, SECTOR_SIZE_BYTES};
use crate::models::{Process, SystemOverview};
use crate::utils::username_for_uid;

use super::{IoCounters, IoSource, ProcessSource, SourceError};

/// Fields we need from `/proc/<pid>/stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFields {
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub flags: u64,
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
    pub rss_pages: u64,
}

impl StatFields {
    pub fn is_kernel_thread(&self) -> bool {
        self.flags & PF_KTHREAD != 0
    }
}

/// Parse `/proc/<pid>/stat`. The command name may itself contain spaces and
/// parentheses, so everything up to the last `)` belongs to it.
pub fn parse_stat(content: &str) -> Option<StatFields> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let comm = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 22 {
        return None;
    }

    Some(StatFields {
        comm,
        state: rest[0].chars().next()?,
        ppid: rest[1].parse().ok()?,
        flags: rest[6].parse().ok()?,
        utime: rest[11].parse().ok()?,
        stime: rest[12].parse().ok()?,
        starttime: rest[19].parse().ok()?,
        rss_pages: rest[21].parse().ok()?,
    })
}

/// NUL-separated arguments joined by spaces.
pub fn parse_cmdline(raw: &[u8]) -> String {
    raw.split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Real UID from `/proc/<pid>/status`.
pub fn parse_status_uid(content: &str) -> Option<u32> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|uids| uids.split_whitespace().next())
        .and_then(|uid| uid.parse().ok())
}

/// Boot time in seconds since the epoch, from `/proc/stat`.
pub fn parse_btime(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime"))
        .and_then(|value| value.trim().parse().ok())
}

/// `(logical, physical)` CPU counts from `/proc/cpuinfo`.
pub fn parse_cpuinfo(content: &str) -> (usize, usize) {
    let mut max_processor: Option<usize> = None;
    let mut core_ids = HashSet::new();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "processor" => {
                if let Ok(n) = value.parse::<usize>() {
                    max_processor = Some(max_processor.map_or(n, |m| m.max(n)));
                }
            }
            "core id" => {
                core_ids.insert(value.to_string());
            }
            _ => {}
        }
    }

    let logical = max_processor.map_or(0, |n| n + 1);
    let physical = if core_ids.is_empty() {
        logical
    } else {
        core_ids.len()
    };
    (logical, physical)
}

/// `(used_kb, total_kb)` from `/proc/meminfo`, swap included in both.
pub fn parse_meminfo(content: &str) -> Option<(u64, u64)> {
    let fields: HashMap<&str, u64> = content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let kb = value.split_whitespace().next()?.parse().ok()?;
            Some((key.trim(), kb))
        })
        .collect();
    let field = |name: &str| fields.get(name).copied().unwrap_or(0);

    let mem_total = *fields.get("MemTotal")?;
    let ram_used = match fields.get("MemAvailable") {
        Some(&available) => mem_total.saturating_sub(available),
        None => mem_total.saturating_sub(
            field("MemFree") + field("Buffers") + field("Cached") + field("SwapCached"),
        ),
    };
    let swap_total = field("SwapTotal");
    let swap_used = swap_total.saturating_sub(field("SwapFree"));

    Some((ram_used + swap_used, mem_total + swap_total))
}

/// First three fields of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Option<(f64, f64, f64)> {
    let mut fields = content.split_whitespace().map(|f| f.parse::<f64>());
    let one = fields.next()?.ok()?;
    let five = fields.next()?.ok()?;
    let fifteen = fields.next()?.ok()?;
    Some((one, five, fifteen))
}

fn net_dev_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([^:\s]+):\s*(\d+)(?:\s+\d+){7}\s+(\d+)").expect("valid net/dev regex")
    })
}

/// Byte counters per interface from `/proc/net/dev`. Interfaces that never
/// moved a byte are left out.
pub fn parse_net_dev(content: &str) -> IoCounters {
    let mut counters = IoCounters::new();
    for line in content.lines() {
        let Some(caps) = net_dev_regex().captures(line) else {
            continue;
        };
        let rx: u64 = caps[2].parse().unwrap_or(0);
        let tx: u64 = caps[3].parse().unwrap_or(0);
        if rx == 0 && tx == 0 {
            continue;
        }
        counters.insert(format!("{} in", &caps[1]), rx);
        counters.insert(format!("{} out", &caps[1]), tx);
    }
    counters
}

/// Byte counters per partition from `/proc/diskstats`. Whole disks are
/// skipped so traffic is not counted twice.
pub fn parse_diskstats(content: &str) -> IoCounters {
    let mut counters = IoCounters::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_DISKSTATS_FIELDS {
            continue;
        }

        let name = fields[2];
        if name.starts_with("ram") || name.starts_with("loop") || name.starts_with("dm-") {
            continue;
        }
        if !name.ends_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        // Field 5 = sectors read, field 9 = sectors written
        let sectors_read: u64 = fields[5].parse().unwrap_or(0);
        let sectors_written: u64 = fields[9].parse().unwrap_or(0);
        counters.insert(format!("{} read", name), sectors_read * SECTOR_SIZE_BYTES);
        counters.insert(format!("{} write", name), sectors_written * SECTOR_SIZE_BYTES);
    }
    counters
}

fn ticks_to_duration(ticks: u64, clock_ticks: u64) -> Duration {
    let secs = ticks / clock_ticks;
    let nanos = (ticks % clock_ticks) * 1_000_000_000 / clock_ticks;
    Duration::new(secs, nanos as u32)
}

fn sysconf_or(name: libc::c_int, fallback: u64) -> u64 {
    let value = unsafe { libc::sysconf(name) };
    if value > 0 {
        value as u64
    } else {
        fallback
    }
}

fn read_string(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|e| SourceError::read(path.display().to_string(), e))
}

/// Process table and overview from a procfs mount.
pub struct ProcfsSource {
    root: PathBuf,
    clock_ticks: u64,
    page_size_kb: u64,
    boot_time: Option<SystemTime>,
    usernames: HashMap<u32, String>,
}

impl ProcfsSource {
    pub fn new() -> Self {
        Self::with_root(
            "/proc",
            sysconf_or(libc::_SC_CLK_TCK, 100),
            sysconf_or(libc::_SC_PAGESIZE, 4096) / 1024,
        )
    }

    pub fn with_root(root: impl Into<PathBuf>, clock_ticks: u64, page_size_kb: u64) -> Self {
        Self {
            root: root.into(),
            clock_ticks: clock_ticks.max(1),
            page_size_kb,
            boot_time: None,
            usernames: HashMap::new(),
        }
    }

    fn boot_time(&mut self) -> Result<SystemTime, SourceError> {
        if let Some(boot_time) = self.boot_time {
            return Ok(boot_time);
        }
        let content = read_string(&self.root.join("stat"))?;
        let btime = parse_btime(&content).ok_or_else(|| SourceError::parse("no btime in stat"))?;
        let boot_time = UNIX_EPOCH + Duration::from_secs(btime);
        self.boot_time = Some(boot_time);
        Ok(boot_time)
    }

    fn username(&mut self, uid: u32) -> String {
        self.usernames
            .entry(uid)
            .or_insert_with(|| username_for_uid(uid).unwrap_or_else(|| uid.to_string()))
            .clone()
    }

    /// Read one process. `None` if it is a kernel thread or vanished while
    /// we were reading it.
    fn read_process(&mut self, pid: u32, boot_time: SystemTime) -> Option<Process> {
        let dir = self.root.join(pid.to_string());
        let stat = parse_stat(&std::fs::read_to_string(dir.join("stat")).ok()?)?;
        if stat.is_kernel_thread() {
            return None;
        }
        let raw_cmdline = std::fs::read(dir.join("cmdline")).ok()?;
        let uid = parse_status_uid(&std::fs::read_to_string(dir.join("status")).ok()?)?;

        let cmdline = if stat.state == 'Z' {
            "<defunct>".to_string()
        } else {
            let cmdline = parse_cmdline(&raw_cmdline);
            if cmdline.is_empty() {
                format!("({})", stat.comm)
            } else {
                cmdline
            }
        };

        let start_time = boot_time + ticks_to_duration(stat.starttime, self.clock_ticks);
        let cpu_time = ticks_to_duration(stat.utime + stat.stime, self.clock_ticks);
        let username = self.username(uid);
        let ppid = Some(stat.ppid).filter(|&ppid| ppid != 0);

        Some(Process::new(
            pid,
            ppid,
            start_time,
            &cmdline,
            &username,
            stat.rss_pages * self.page_size_kb,
            Some(cpu_time),
        ))
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for ProcfsSource {
    fn processes(&mut self) -> Result<Vec<Process>, SourceError> {
        let boot_time = self.boot_time()?;
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| SourceError::read(self.root.display().to_string(), e))?;

        let pids: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();

        Ok(pids
            .into_iter()
            .filter_map(|pid| self.read_process(pid, boot_time))
            .collect())
    }

    fn overview(&mut self) -> Result<SystemOverview, SourceError> {
        let (logical_cpus, physical_cpus) = parse_cpuinfo(&read_string(&self.root.join("cpuinfo"))?);
        let (used_memory_kb, total_memory_kb) = parse_meminfo(&read_string(&self.root.join("meminfo"))?)
            .ok_or_else(|| SourceError::parse("no MemTotal in meminfo"))?;
        let (load_avg_1, load_avg_5, load_avg_15) = parse_loadavg(&read_string(&self.root.join("loadavg"))?)
            .ok_or_else(|| SourceError::parse("malformed loadavg"))?;

        Ok(SystemOverview {
            load_avg_1,
            load_avg_5,
            load_avg_15,
            logical_cpus,
            physical_cpus,
            used_memory_kb,
            total_memory_kb,
        })
    }
}

/// Network and disk byte counters from procfs.
pub struct ProcfsIoSource;

impl IoSource for ProcfsIoSource {
    fn counters(&mut self) -> Result<IoCounters, SourceError> {
        let mut counters = parse_net_dev(&read_string(Path::new("/proc/net/dev"))?);
        counters.extend(parse_diskstats(&read_string(Path::new("/proc/diskstats"))?));
        Ok(counters)
    }
}
