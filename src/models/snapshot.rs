use std::collections::HashMap;

use super::process::{Process, ProcessId};

/// Processes from one sampling tick, stored as an arena so that parent links
/// are plain indices.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    processes: Vec<Process>,
    by_pid: HashMap<u32, usize>,
}

impl Snapshot {
    /// Build a snapshot and resolve every `ppid` into a `parent_ix`.
    /// Parents missing from the list leave a gap (`parent_ix == None`).
    pub fn new(mut processes: Vec<Process>) -> Self {
        processes.sort_by_key(|p| p.pid);
        let by_pid: HashMap<u32, usize> = processes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.pid, i))
            .collect();

        for process in processes.iter_mut() {
            process.parent_ix = process
                .ppid
                .filter(|&ppid| ppid != process.pid)
                .and_then(|ppid| by_pid.get(&ppid).copied());
        }

        Self { processes, by_pid }
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    pub fn get(&self, pid: u32) -> Option<&Process> {
        self.by_pid.get(&pid).map(|&i| &self.processes[i])
    }

    /// Look up a process by identity, ignoring reused PIDs.
    pub fn find(&self, id: ProcessId) -> Option<&Process> {
        self.get(id.pid).filter(|p| p.start_time == id.start_time)
    }

    pub fn parent_of(&self, process: &Process) -> Option<&Process> {
        process.parent_ix.map(|i| &self.processes[i])
    }

    /// Keep only processes matching `filter`. Parent links into the removed
    /// part of the tree become gaps.
    pub fn filtered(&self, filter: &str) -> Snapshot {
        if filter.is_empty() {
            return self.clone();
        }
        Snapshot::new(
            self.processes
                .iter()
                .filter(|p| p.matches(filter))
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn make_process(pid: u32, ppid: Option<u32>, cmdline: &str) -> Process {
        Process::new(
            pid,
            ppid,
            UNIX_EPOCH + Duration::from_secs(pid as u64),
            cmdline,
            "user",
            0,
            None,
        )
    }

    #[test]
    fn resolves_parent_indices() {
        let snapshot = Snapshot::new(vec![
            make_process(10, Some(1), "child"),
            make_process(1, None, "init"),
        ]);
        let child = snapshot.get(10).unwrap();
        let parent = snapshot.parent_of(child).unwrap();
        assert_eq!(parent.pid, 1);
        assert!(snapshot.parent_of(parent).is_none());
    }

    #[test]
    fn missing_parent_is_a_gap() {
        let snapshot = Snapshot::new(vec![make_process(10, Some(5), "orphan")]);
        assert!(snapshot.parent_of(snapshot.get(10).unwrap()).is_none());
    }

    #[test]
    fn self_parent_is_ignored() {
        let snapshot = Snapshot::new(vec![make_process(1, Some(1), "init")]);
        assert!(snapshot.get(1).unwrap().parent_ix.is_none());
    }

    #[test]
    fn find_checks_start_time() {
        let snapshot = Snapshot::new(vec![make_process(10, None, "x")]);
        let mut id = snapshot.get(10).unwrap().id();
        assert!(snapshot.find(id).is_some());
        id.start_time += Duration::from_secs(1);
        assert!(snapshot.find(id).is_none());
    }

    #[test]
    fn filtered_keeps_matches_only() {
        let snapshot = Snapshot::new(vec![
            make_process(1, None, "init"),
            make_process(2, Some(1), "sshd"),
            make_process(3, Some(2), "bash"),
        ]);
        let filtered = snapshot.filtered("sh");
        let pids: Vec<u32> = filtered.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 3]);
        assert!(filtered.get(2).unwrap().parent_ix.is_none());
        assert_eq!(filtered.get(3).unwrap().parent_ix, Some(0));
    }
}
