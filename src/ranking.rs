//! Ordering and grouping of processes for display.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::constants::TOP_CPU_ROWS;
use crate::models::{Process, Snapshot};

/// What the scorer looks at for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub name: String,
    pub cpu_time: Duration,
    pub rss_kb: u64,
    pub nativity: usize,
}

impl Stats {
    pub fn of(process: &Process) -> Self {
        Stats {
            name: process.command.clone(),
            cpu_time: process.cpu_time_or_zero(),
            rss_kb: process.rss_kb,
            nativity: process.nativity,
        }
    }
}

/// Sum of a group of processes, as shown in the "By User" and "By Command"
/// panes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub name: String,
    pub cpu_time: Duration,
    pub rss_kb: u64,
    pub nativity: usize,
}

impl Aggregate {
    pub fn stats(&self) -> Stats {
        Stats {
            name: self.name.clone(),
            cpu_time: self.cpu_time,
            rss_kb: self.rss_kb,
            nativity: self.nativity,
        }
    }
}

struct Maxima {
    cpu: f64,
    rss: f64,
    nativity: f64,
}

impl Maxima {
    fn of<'a>(all: impl Iterator<Item = &'a Stats>) -> Self {
        let mut maxima = Maxima {
            cpu: 1.0,
            rss: 1.0,
            nativity: 1.0,
        };
        for stats in all {
            maxima.cpu = maxima.cpu.max(stats.cpu_time.as_secs_f64());
            maxima.rss = maxima.rss.max(stats.rss_kb as f64);
            maxima.nativity = maxima.nativity.max(stats.nativity as f64);
        }
        maxima
    }

    /// Normalized scores, highest first.
    fn scores(&self, stats: &Stats) -> [f64; 3] {
        let mut scores = [
            stats.cpu_time.as_secs_f64() / self.cpu,
            stats.rss_kb as f64 / self.rss,
            stats.nativity as f64 / self.nativity,
        ];
        scores.sort_by(|a, b| b.total_cmp(a));
        scores
    }
}

fn compare_scores(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| y.total_cmp(x))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Sort by tri-score: whatever an item is best at counts first. Equal
/// scores are ordered by name. The [`TOP_CPU_ROWS`] winners are then
/// reordered by raw CPU time.
pub fn sort_by_score<T>(items: Vec<T>, stats: impl Fn(&T) -> Stats) -> Vec<T> {
    let keyed: Vec<(Stats, T)> = items.into_iter().map(|item| (stats(&item), item)).collect();
    let maxima = Maxima::of(keyed.iter().map(|(s, _)| s));

    let mut scored: Vec<([f64; 3], Stats, T)> = keyed
        .into_iter()
        .map(|(s, item)| (maxima.scores(&s), s, item))
        .collect();
    scored.sort_by(|(a_scores, a, _), (b_scores, b, _)| {
        compare_scores(a_scores, b_scores).then_with(|| a.name.cmp(&b.name))
    });

    let top = scored.len().min(TOP_CPU_ROWS);
    scored[..top].sort_by(|(_, a, _), (_, b, _)| b.cpu_time.cmp(&a.cpu_time));

    scored.into_iter().map(|(_, _, item)| item).collect()
}

/// Processes of a snapshot in display order.
pub fn sorted_processes(snapshot: &Snapshot) -> Vec<Process> {
    sort_by_score(snapshot.iter().cloned().collect(), Stats::of)
}

/// One aggregate per distinct key.
pub fn aggregate<'a, K>(processes: impl Iterator<Item = &'a Process>, key: K) -> Vec<Aggregate>
where
    K: Fn(&Process) -> &str,
{
    let mut groups: BTreeMap<String, Aggregate> = BTreeMap::new();
    for process in processes {
        let name = key(process);
        let group = groups.entry(name.to_string()).or_insert_with(|| Aggregate {
            name: name.to_string(),
            cpu_time: Duration::ZERO,
            rss_kb: 0,
            nativity: 0,
        });
        group.cpu_time += process.cpu_time_or_zero();
        group.rss_kb += process.rss_kb;
        group.nativity += process.nativity;
    }
    groups.into_values().collect()
}

/// Per-user totals in display order.
pub fn by_user(snapshot: &Snapshot) -> Vec<Aggregate> {
    sort_by_score(aggregate(snapshot.iter(), |p| &p.username), Aggregate::stats)
}

/// Per-command totals in display order.
pub fn by_command(snapshot: &Snapshot) -> Vec<Aggregate> {
    sort_by_score(aggregate(snapshot.iter(), |p| &p.command), Aggregate::stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::UNIX_EPOCH;

    fn item(name: &str, cpu: u64, rss: u64) -> Stats {
        Stats {
            name: name.to_string(),
            cpu_time: Duration::from_secs(cpu),
            rss_kb: rss,
            nativity: 0,
        }
    }

    fn names(items: &[Stats]) -> Vec<&str> {
        items.iter().map(|s| s.name.as_str()).collect()
    }

    fn make_process(pid: u32, cmdline: &str, user: &str, cpu: u64, rss: u64) -> Process {
        Process::new(
            pid,
            None,
            UNIX_EPOCH + Duration::from_secs(pid as u64),
            cmdline,
            user,
            rss,
            Some(Duration::from_secs(cpu)),
        )
    }

    // ── tri-score ─────────────────────────────────────────────────

    #[test]
    fn top_three_are_reordered_by_cpu() {
        let items = vec![
            item("X", 10, 100),
            item("Y", 100, 10),
            item("Z", 50, 50),
            item("W", 1, 1),
        ];
        let sorted = sort_by_score(items, Stats::clone);
        assert_eq!(names(&sorted), vec!["Y", "Z", "X", "W"]);
    }

    #[test]
    fn best_axis_counts_first() {
        // "mem" and "cpu" both top one axis; the second best score ranks
        // "mem" ahead, then the top rows are reordered by CPU.
        let items = vec![
            item("a", 1, 1),
            item("b", 1, 1),
            item("c", 1, 1),
            item("mem", 5, 1000),
            item("cpu", 100, 10),
            item("mix", 60, 600),
        ];
        let sorted = sort_by_score(items, Stats::clone);
        let order = names(&sorted);
        assert_eq!(&order[..3], &["cpu", "mix", "mem"]);
        assert_eq!(&order[3..], &["a", "b", "c"]);
    }

    #[test]
    fn nativity_is_an_axis() {
        let mut busy = item("forky", 1, 2);
        busy.nativity = 20;
        let items = vec![
            item("a", 1, 2),
            item("b", 1, 2),
            item("c", 1, 2),
            item("hog", 4, 10),
            busy,
        ];
        let sorted = sort_by_score(items, Stats::clone);
        assert!(names(&sorted)[..3].contains(&"forky"));
    }

    #[test]
    fn empty_and_single() {
        assert!(sort_by_score(Vec::<Stats>::new(), Stats::clone).is_empty());
        let sorted = sort_by_score(vec![item("only", 0, 0)], Stats::clone);
        assert_eq!(names(&sorted), vec!["only"]);
    }

    // ── aggregation ───────────────────────────────────────────────

    #[test]
    fn aggregates_sum_per_key() {
        let mut a = make_process(1, "bash", "alice", 10, 100);
        a.nativity = 2;
        let snapshot = Snapshot::new(vec![
            a,
            make_process(2, "vim", "alice", 5, 50),
            make_process(3, "bash", "bob", 1, 10),
        ]);

        let users = by_user(&snapshot);
        let alice = users.iter().find(|u| u.name == "alice").unwrap();
        assert_eq!(alice.cpu_time, Duration::from_secs(15));
        assert_eq!(alice.rss_kb, 150);
        assert_eq!(alice.nativity, 2);

        let commands = by_command(&snapshot);
        let bash = commands.iter().find(|c| c.name == "bash").unwrap();
        assert_eq!(bash.cpu_time, Duration::from_secs(11));
        assert_eq!(bash.rss_kb, 110);
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn processes_without_cpu_time_count_as_zero() {
        let mut p = make_process(1, "x", "u", 0, 10);
        p.cpu_time = None;
        let groups = aggregate([p].iter(), |p| &p.username);
        assert_eq!(groups[0].cpu_time, Duration::ZERO);
    }

    // ── properties ────────────────────────────────────────────────

    fn arb_stats() -> impl Strategy<Value = Vec<Stats>> {
        proptest::collection::vec(
            ("[a-e]", 0u64..5, 0u64..5, 0usize..3).prop_map(|(name, cpu, rss, nat)| Stats {
                name,
                cpu_time: Duration::from_secs(cpu),
                rss_kb: rss,
                nativity: nat,
            }),
            0..30,
        )
    }

    proptest! {
        #[test]
        fn sort_is_a_permutation(items in arb_stats()) {
            let sorted = sort_by_score(items.clone(), Stats::clone);
            let mut before = items.clone();
            let mut after = sorted.clone();
            before.sort_by(|a, b| a.name.cmp(&b.name).then(a.cpu_time.cmp(&b.cpu_time)).then(a.rss_kb.cmp(&b.rss_kb)).then(a.nativity.cmp(&b.nativity)));
            after.sort_by(|a, b| a.name.cmp(&b.name).then(a.cpu_time.cmp(&b.cpu_time)).then(a.rss_kb.cmp(&b.rss_kb)).then(a.nativity.cmp(&b.nativity)));
            prop_assert_eq!(before, after);
        }

        #[test]
        fn tail_is_ordered_by_score_then_name(items in arb_stats()) {
            let maxima = Maxima::of(items.iter());
            let sorted = sort_by_score(items.clone(), Stats::clone);
            let tail = if sorted.len() > TOP_CPU_ROWS { &sorted[TOP_CPU_ROWS..] } else { &[][..] };
            for pair in tail.windows(2) {
                let order = compare_scores(&maxima.scores(&pair[0]), &maxima.scores(&pair[1]))
                    .then_with(|| pair[0].name.cmp(&pair[1].name));
                prop_assert_ne!(order, Ordering::Greater);
            }
        }

        #[test]
        fn head_is_ordered_by_cpu(items in arb_stats()) {
            let sorted = sort_by_score(items, Stats::clone);
            let top = sorted.len().min(TOP_CPU_ROWS);
            for pair in sorted[..top].windows(2) {
                prop_assert!(pair[0].cpu_time >= pair[1].cpu_time);
            }
        }

        #[test]
        fn equal_rows_keep_input_order(n in 0usize..10) {
            let items: Vec<(usize, Stats)> = (0..n).map(|i| (i, item("same", 1, 1))).collect();
            let sorted = sort_by_score(items, |(_, s)| s.clone());
            let order: Vec<usize> = sorted.iter().map(|(i, _)| *i).collect();
            prop_assert_eq!(order, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn filter_matches_and_is_idempotent(
            rows in proptest::collection::vec(("[a-z]{1,6}", "[a-z]{1,4}"), 0..20),
            filter in "[a-z]{0,2}",
        ) {
            let processes: Vec<Process> = rows
                .iter()
                .enumerate()
                .map(|(i, (cmd, user))| make_process(i as u32 + 100, cmd, user, 0, 0))
                .collect();
            let snapshot = Snapshot::new(processes);
            let once = snapshot.filtered(&filter);

            for p in snapshot.iter() {
                prop_assert_eq!(once.find(p.id()).is_some(), p.matches(&filter));
            }
            let twice = once.filtered(&filter);
            let a: Vec<u32> = once.iter().map(|p| p.pid).collect();
            let b: Vec<u32> = twice.iter().map(|p| p.pid).collect();
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn sorted_processes_uses_commands() {
        let snapshot = Snapshot::new(vec![
            make_process(1, "idle", "u", 0, 1),
            make_process(2, "hog", "u", 100, 1),
        ]);
        let sorted = sorted_processes(&snapshot);
        assert_eq!(sorted[0].command, "hog");
    }
}
