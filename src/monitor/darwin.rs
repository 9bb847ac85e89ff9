//! Sampling through `ps`, `iostat` and `netstat` on systems without procfs.

use std::process::Command;
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDateTime, TimeZone};
use sysinfo::System;

use crate::models::{Process, SystemOverview};

use super::{IoCounters, IoSource, ProcessSource, SourceError};

const PS_ARGS: &[&str] = &["-axww", "-o", "pid=,ppid=,rss=,time=,user=,lstart=,command="];
const LSTART_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Run a tool with a predictable (English, C) number format.
fn run(program: &str, args: &[&str]) -> Result<String, SourceError> {
    let mut command = Command::new(program);
    command.args(args).env_remove("LANG");
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("LC_") {
            command.env_remove(key);
        }
    }

    let output = command.output().map_err(|source| SourceError::Spawn {
        command: program.to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(SourceError::Exit {
            command: program.to_string(),
            status: output.status.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The first `n` whitespace separated fields, and the rest of the line with
/// its inner spacing intact.
fn split_fields(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = line.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    Some((fields, rest))
}

/// Parse `ps` CPU time: `[[dd-]hh:]mm:ss[.ss]`.
pub fn parse_cpu_time(text: &str) -> Option<Duration> {
    let (days, clock) = match text.split_once('-') {
        Some((days, clock)) => (days.parse::<u64>().ok()?, clock),
        None => (0, text),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    let seconds: f64 = seconds.parse().ok()?;
    if !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = ((days * 24 + hours) * 60 + minutes) * 60;
    Some(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}

/// Parse `ps -o lstart`, which is in local time.
pub fn parse_lstart(text: &str) -> Option<SystemTime> {
    let naive = NaiveDateTime::parse_from_str(text, LSTART_FORMAT).ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(SystemTime::from(local))
}

/// One line of `ps -o pid=,ppid=,rss=,time=,user=,lstart=,command=`.
pub fn parse_ps_line(line: &str) -> Option<Process> {
    let (fields, command) = split_fields(line, 10)?;
    let pid: u32 = fields[0].parse().ok()?;
    let ppid: u32 = fields[1].parse().ok()?;
    let rss_kb: u64 = fields[2].parse().ok()?;
    let cpu_time = parse_cpu_time(fields[3]);
    let username = fields[4];
    let start_time = parse_lstart(&fields[5..10].join(" "))?;

    Some(Process::new(
        pid,
        Some(ppid).filter(|&ppid| ppid != 0),
        start_time,
        command,
        username,
        rss_kb,
        cpu_time,
    ))
}

pub fn parse_ps(output: &str) -> Result<Vec<Process>, SourceError> {
    let mut processes = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        match parse_ps_line(line) {
            Some(process) => processes.push(process),
            None => log::debug!("Skipping unparsable ps line: {:?}", line),
        }
    }
    if processes.is_empty() {
        return Err(SourceError::parse("ps listed no processes"));
    }
    Ok(processes)
}

/// `iostat -dKI -n 99` prints exactly three lines: device names, column
/// headers and one `KB/t xfrs MB` triplet per device. The MB column is the
/// cumulative transfer.
pub fn parse_iostat(output: &str) -> Result<IoCounters, SourceError> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() != 3 {
        return Err(SourceError::parse(format!(
            "expected 3 lines of iostat output, got {}",
            lines.len()
        )));
    }

    let devices: Vec<&str> = lines[0].split_whitespace().collect();
    let numbers: Vec<&str> = lines[2].split_whitespace().collect();
    if numbers.len() != devices.len() * 3 {
        return Err(SourceError::parse(format!(
            "{} iostat devices but {} numbers",
            devices.len(),
            numbers.len()
        )));
    }

    let mut counters = IoCounters::new();
    for (device, triplet) in devices.iter().zip(numbers.chunks(3)) {
        let mb: f64 = triplet[2]
            .parse()
            .map_err(|_| SourceError::parse(format!("bad iostat MB value {:?}", triplet[2])))?;
        counters.insert(device.to_string(), (mb * BYTES_PER_MB) as u64);
    }
    Ok(counters)
}

/// `netstat -bni`. The Address column can be blank, so byte columns are
/// located by their distance from the end of the header.
pub fn parse_netstat(output: &str) -> Result<IoCounters, SourceError> {
    let mut lines = output.lines();
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| SourceError::parse("empty netstat output"))?
        .split_whitespace()
        .collect();
    let from_end = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .map(|i| header.len() - i)
            .ok_or_else(|| SourceError::parse(format!("no {} column in netstat output", name)))
    };
    let ibytes = from_end("Ibytes")?;
    let obytes = from_end("Obytes")?;

    let mut counters = IoCounters::new();
    for line in lines {
        let row: Vec<&str> = line.split_whitespace().collect();
        if row.len() < 3 || !row[2].starts_with("<Link") {
            continue;
        }
        let label = row[0].trim_end_matches('*');
        if counters.contains_key(&format!("{} in", label)) {
            continue;
        }
        if row.len() < ibytes.max(obytes) {
            continue;
        }
        let rx: u64 = row[row.len() - ibytes].parse().unwrap_or(0);
        let tx: u64 = row[row.len() - obytes].parse().unwrap_or(0);
        if rx == 0 && tx == 0 {
            continue;
        }
        counters.insert(format!("{} in", label), rx);
        counters.insert(format!("{} out", label), tx);
    }
    Ok(counters)
}

/// Process table via `ps`, overview via sysinfo.
pub struct PsSource {
    system: System,
}

impl PsSource {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }
}

impl Default for PsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for PsSource {
    fn processes(&mut self) -> Result<Vec<Process>, SourceError> {
        parse_ps(&run("ps", PS_ARGS)?)
    }

    fn overview(&mut self) -> Result<SystemOverview, SourceError> {
        self.system.refresh_memory();
        let load = System::load_average();
        let logical_cpus = self.system.cpus().len();

        Ok(SystemOverview {
            load_avg_1: load.one,
            load_avg_5: load.five,
            load_avg_15: load.fifteen,
            logical_cpus,
            physical_cpus: logical_cpus,
            used_memory_kb: (self.system.used_memory() + self.system.used_swap()) / 1024,
            total_memory_kb: (self.system.total_memory() + self.system.total_swap()) / 1024,
        })
    }
}

/// Disk counters from `iostat`, network counters from `netstat`.
pub struct CommandIoSource;

impl IoSource for CommandIoSource {
    fn counters(&mut self) -> Result<IoCounters, SourceError> {
        let mut counters = parse_iostat(&run("iostat", &["-dKI", "-n", "99"])?)?;
        counters.extend(parse_netstat(&run("netstat", &["-bni"])?)?);
        Ok(counters)
    }
}
