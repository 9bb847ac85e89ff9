//! Disambiguating suffixes for processes sharing a command name.

use std::collections::{HashMap, HashSet};

use crate::models::{Process, ProcessId};

/// Keeps track of which processes share a command. Indexed both by identity
/// and by command so a process whose command changes is moved, not lost.
#[derive(Debug, Default)]
pub struct Deduplicator {
    by_id: HashMap<ProcessId, String>,
    by_command: HashMap<String, Vec<ProcessId>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a process. If it was registered under another command
    /// before, it is moved to its current one.
    pub fn register(&mut self, process: &Process) {
        let id = process.id();
        if let Some(previous) = self.by_id.get(&id) {
            if *previous == process.command {
                return;
            }
            let previous = previous.clone();
            self.remove_from_command(&previous, id);
        }

        self.by_id.insert(id, process.command.clone());
        let group = self.by_command.entry(process.command.clone()).or_default();
        let position = group
            .binary_search_by(|probe| probe.start_time.cmp(&id.start_time).then(probe.pid.cmp(&id.pid)))
            .unwrap_or_else(|e| e);
        group.insert(position, id);
    }

    /// Forget everything not in `alive`.
    pub fn retain(&mut self, alive: &HashSet<ProcessId>) {
        let dead: Vec<(ProcessId, String)> = self
            .by_id
            .iter()
            .filter(|(id, _)| !alive.contains(id))
            .map(|(id, command)| (*id, command.clone()))
            .collect();
        for (id, command) in dead {
            self.by_id.remove(&id);
            self.remove_from_command(&command, id);
        }
    }

    fn remove_from_command(&mut self, command: &str, id: ProcessId) {
        if let Some(group) = self.by_command.get_mut(command) {
            group.retain(|other| *other != id);
            if group.is_empty() {
                self.by_command.remove(command);
            }
        }
    }

    /// `""` for unique commands, otherwise the 1-based age rank as text.
    ///
    /// Panics if the process was never registered; callers always register
    /// first.
    pub fn suffix(&self, process: &Process) -> String {
        let id = process.id();
        let command = match self.by_id.get(&id) {
            Some(command) => command,
            None => panic!(
                "deduplicator lookup miss: pid {} ({:?}) was never registered",
                process.pid, process.command
            ),
        };
        let group = &self.by_command[command];
        if group.len() < 2 {
            return String::new();
        }
        let rank = group
            .iter()
            .position(|other| *other == id)
            .map(|i| i + 1)
            .unwrap_or_default();
        rank.to_string()
    }

    /// Register all processes, drop stale entries and fill in every
    /// `deduplication_suffix`.
    pub fn apply(&mut self, processes: &mut [Process]) {
        let alive: HashSet<ProcessId> = processes.iter().map(Process::id).collect();
        self.retain(&alive);
        for process in processes.iter() {
            self.register(process);
        }
        for process in processes.iter_mut() {
            process.deduplication_suffix = self.suffix(process);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn make_process(pid: u32, start: u64, cmdline: &str) -> Process {
        Process::new(pid, None, at(start), cmdline, "user", 0, None)
    }

    #[test]
    fn unique_command_has_no_suffix() {
        let mut dedup = Deduplicator::new();
        let p = make_process(1, 10, "foo");
        dedup.register(&p);
        assert_eq!(dedup.suffix(&p), "");
    }

    #[test]
    fn command_change_moves_process() {
        let mut dedup = Deduplicator::new();
        let p1 = make_process(47070, 40, "foo");
        let g1 = make_process(99998, 39, "git");
        let g2 = make_process(99999, 38, "git");
        dedup.register(&p1);
        dedup.register(&g1);
        dedup.register(&g2);
        assert_eq!(dedup.suffix(&p1), "");

        let p1_git = make_process(47070, 40, "git");
        dedup.register(&p1_git);

        assert_eq!(dedup.suffix(&g2), "1");
        assert_eq!(dedup.suffix(&g1), "2");
        assert_eq!(dedup.suffix(&p1_git), "3");
    }

    #[test]
    fn retain_drops_dead_processes() {
        let mut dedup = Deduplicator::new();
        let a = make_process(1, 10, "git");
        let b = make_process(2, 11, "git");
        dedup.register(&a);
        dedup.register(&b);
        assert_eq!(dedup.suffix(&b), "2");

        dedup.retain(&HashSet::from([b.id()]));
        assert_eq!(dedup.suffix(&b), "");
    }

    #[test]
    fn apply_fills_suffixes() {
        let mut dedup = Deduplicator::new();
        let mut processes = vec![
            make_process(3, 30, "bash"),
            make_process(1, 10, "bash"),
            make_process(2, 20, "vim"),
        ];
        dedup.apply(&mut processes);
        let suffixes: Vec<&str> = processes
            .iter()
            .map(|p| p.deduplication_suffix.as_str())
            .collect();
        assert_eq!(suffixes, vec!["2", "1", ""]);
    }

    #[test]
    #[should_panic(expected = "deduplicator lookup miss")]
    fn unregistered_lookup_panics() {
        let dedup = Deduplicator::new();
        dedup.suffix(&make_process(1, 1, "x"));
    }

    proptest! {
        #[test]
        fn suffixes_are_distinct_and_age_ordered(
            starts in proptest::collection::hash_set(0u64..10_000, 2..20)
        ) {
            let mut dedup = Deduplicator::new();
            let mut processes: Vec<Process> = starts
                .iter()
                .enumerate()
                .map(|(i, &start)| make_process(i as u32 + 1, start, "same"))
                .collect();
            dedup.apply(&mut processes);

            processes.sort_by_key(|p| p.start_time);
            for (i, p) in processes.iter().enumerate() {
                prop_assert_eq!(&p.deduplication_suffix, &(i + 1).to_string());
            }
        }
    }
}
