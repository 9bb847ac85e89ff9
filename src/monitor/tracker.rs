//! Background process sampler.
//!
//! Each tick turns a raw process list into a published snapshot: names of
//! exiting processes are preserved, child deaths are credited to their
//! parents, duplicate names get suffixes and new launches go into the launch
//! tree. Readers get defensive copies with CPU time counted from startup.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Instant, SystemTime};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::constants::{NATIVITY_MAX_AGE, PROCESS_SAMPLE_INTERVAL};
use crate::models::{Process, Snapshot, SystemOverview};

use super::dedup::Deduplicator;
use super::launch_tree::{record_launch, LaunchNode, LaunchTreeError};
use super::ProcessSource;

type ProcessMap = HashMap<u32, Process>;

/// Cross-tick state. Owned by the tracker, mutated once per tick.
#[derive(Debug, Default)]
pub struct TrackerState {
    baseline: Option<ProcessMap>,
    current: ProcessMap,
    launches: Option<LaunchNode>,
    dedup: Deduplicator,
    overview: SystemOverview,
    ticks: u64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the state and publish it as `current`.
    pub fn tick(&mut self, now: SystemTime, processes: Vec<Process>) -> Result<(), LaunchTreeError> {
        let mut next: ProcessMap = processes.into_iter().map(|p| (p.pid, p)).collect();
        self.ticks += 1;

        if self.baseline.is_none() {
            self.assign_suffixes(&mut next);
            self.baseline = Some(next.clone());
            self.current = next;
            return Ok(());
        }

        preserve_dying_names(&self.current, &mut next);
        track_deaths(&self.current, &mut next);
        preserve_dead_children(&self.current, &mut next, now);
        self.assign_suffixes(&mut next);
        update_launches(&mut self.launches, &self.current, &next)?;

        self.current = next;
        Ok(())
    }

    fn assign_suffixes(&mut self, processes: &mut ProcessMap) {
        let mut list: Vec<Process> = processes.drain().map(|(_, p)| p).collect();
        self.dedup.apply(&mut list);
        processes.extend(list.into_iter().map(|p| (p.pid, p)));
    }

    pub fn set_overview(&mut self, overview: SystemOverview) {
        self.overview = overview;
    }

    /// Defensive copy of the current processes. Long-lived processes report
    /// CPU time spent since the baseline was taken; processes born later
    /// report their full CPU time.
    pub fn snapshot(&self) -> Snapshot {
        let baseline = self.baseline.as_ref();
        let processes = self
            .current
            .values()
            .map(|process| {
                let mut process = process.clone();
                let base = baseline
                    .and_then(|b| b.get(&process.pid))
                    .filter(|b| b.start_time == process.start_time);
                if let Some(base) = base {
                    if let (Some(now), Some(then)) = (process.cpu_time, base.cpu_time) {
                        process.cpu_time = Some(now.saturating_sub(then));
                    }
                }
                process
            })
            .collect();
        Snapshot::new(processes)
    }

    pub fn launches(&self) -> Option<LaunchNode> {
        self.launches.clone()
    }

    pub fn overview(&self) -> SystemOverview {
        self.overview.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// The OS may show `(bash)`, `<defunct>` or `<exiting>` for a process on its
/// way out. Keep the last real name instead.
fn preserve_dying_names(previous: &ProcessMap, next: &mut ProcessMap) {
    for process in next.values_mut() {
        if !process.is_dying() {
            continue;
        }
        let Some(before) = previous.get(&process.pid) else {
            continue;
        };
        if !before.same_as(process) {
            continue;
        }
        process.cmdline = before.cmdline.clone();
        process.command = before.command.clone();
        process.lowercase_command = before.lowercase_command.clone();
    }
}

/// Credit every process that disappeared to its parent in `next`.
fn track_deaths(previous: &ProcessMap, next: &mut ProcessMap) {
    for dead in previous.values() {
        let survived = next
            .get(&dead.pid)
            .is_some_and(|p| p.start_time == dead.start_time);
        if survived {
            continue;
        }
        let Some(parent) = dead.ppid.and_then(|ppid| next.get_mut(&ppid)) else {
            continue;
        };
        parent.dead_children_birth_times.insert(dead.start_time);
    }
}

/// Carry recent child deaths over from the previous sample of the same
/// process, then count them.
fn preserve_dead_children(previous: &ProcessMap, next: &mut ProcessMap, now: SystemTime) {
    let cutoff = now.checked_sub(NATIVITY_MAX_AGE).unwrap_or(SystemTime::UNIX_EPOCH);
    for process in next.values_mut() {
        if let Some(before) = previous.get(&process.pid).filter(|b| b.same_as(process)) {
            process.dead_children_birth_times.extend(
                before
                    .dead_children_birth_times
                    .iter()
                    .filter(|&&birth| birth > cutoff),
            );
        }
        process.nativity = process.dead_children_birth_times.len();
    }
}

/// Commands from the eldest known ancestor down to `pid`.
fn ancestry(snapshot: &Snapshot, pid: u32) -> Vec<&str> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = snapshot.get(pid);
    while let Some(process) = cursor {
        if !seen.insert(process.pid) {
            break;
        }
        chain.push(process.command.as_str());
        cursor = snapshot.parent_of(process);
    }
    chain.reverse();
    chain
}

fn update_launches(
    launches: &mut Option<LaunchNode>,
    previous: &ProcessMap,
    next: &ProcessMap,
) -> Result<(), LaunchTreeError> {
    let mut launched: Vec<(SystemTime, u32)> = next
        .values()
        .filter(|p| !previous.get(&p.pid).is_some_and(|before| before.same_as(p)))
        .map(|p| (p.start_time, p.pid))
        .collect();
    if launched.is_empty() {
        return Ok(());
    }
    launched.sort();

    let snapshot = Snapshot::new(next.values().cloned().collect());
    for (_, pid) in launched {
        record_launch(launches, &ancestry(&snapshot, pid))?;
    }
    Ok(())
}

/// Shared handle: the sampler writes, the UI reads.
#[derive(Debug, Clone, Default)]
pub struct ProcessTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    pub fn launches(&self) -> Option<LaunchNode> {
        self.lock().launches()
    }

    pub fn overview(&self) -> SystemOverview {
        self.lock().overview()
    }

    pub fn ticks(&self) -> u64 {
        self.lock().ticks()
    }

    /// Take one sample. Returns `false` if the source failed, in which case
    /// the previous snapshot stays published.
    pub fn sample(&self, source: &mut dyn ProcessSource) -> bool {
        let processes = match source.processes() {
            Ok(processes) => processes,
            Err(e) => {
                log::error!("Sampling processes failed: {}", e);
                return false;
            }
        };
        let overview = match source.overview() {
            Ok(overview) => Some(overview),
            Err(e) => {
                log::info!("Sampling system overview failed: {}", e);
                None
            }
        };

        let mut state = self.lock();
        if let Some(overview) = overview {
            state.set_overview(overview);
        }
        if let Err(e) = state.tick(SystemTime::now(), processes) {
            panic!("Launch tree invariant violated: {}", e);
        }
        true
    }

    /// Sample forever, signalling `wake` after each published snapshot. A
    /// pending wake-up is not duplicated. Returns when the receiver is gone.
    pub fn run(&self, mut source: Box<dyn ProcessSource>, wake: mpsc::Sender<()>) {
        loop {
            let started = Instant::now();
            if self.sample(source.as_mut()) {
                match wake.try_send(()) {
                    Ok(()) | Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Closed(())) => return,
                }
            }
            std::thread::sleep(PROCESS_SAMPLE_INTERVAL.saturating_sub(started.elapsed()));
        }
    }
}
