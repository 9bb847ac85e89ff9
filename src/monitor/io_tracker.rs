//! Background sampler turning I/O byte counters into rates.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::constants::IO_SAMPLE_INTERVAL;
use crate::models::IoStat;

use super::{IoCounters, IoSource};

#[derive(Debug, Default)]
struct IoState {
    previous: Option<(Instant, IoCounters)>,
    stats: BTreeMap<String, IoStat>,
    total_rate: f64,
    total_high_watermark: f64,
}

impl IoState {
    fn update(&mut self, at: Instant, counters: IoCounters) {
        if let Some((then, before)) = &self.previous {
            let elapsed = at.saturating_duration_since(*then).as_secs_f64();
            if elapsed > 0.0 {
                let mut stats = BTreeMap::new();
                for (label, &now) in &counters {
                    let Some(&was) = before.get(label) else {
                        continue;
                    };
                    // Counters that went backwards were reset, not negative.
                    let rate = now.saturating_sub(was) as f64 / elapsed;
                    let high_watermark = self
                        .stats
                        .get(label)
                        .map_or(0.0, |s| s.high_watermark)
                        .max(rate);
                    stats.insert(
                        label.clone(),
                        IoStat {
                            device_name: label.clone(),
                            bytes_per_second: rate,
                            high_watermark,
                        },
                    );
                }

                self.total_rate = stats.values().map(|s| s.bytes_per_second).sum();
                self.total_high_watermark = self.total_high_watermark.max(self.total_rate);
                self.stats = stats;
            }
        }
        self.previous = Some((at, counters));
    }

    fn sorted_stats(&self) -> Vec<IoStat> {
        let mut stats: Vec<IoStat> = self.stats.values().cloned().collect();
        // BTreeMap order is by label, and the sort is stable
        stats.sort_by(|a, b| b.bytes_per_second.total_cmp(&a.bytes_per_second));
        stats
    }
}

/// Shared handle to the I/O rates. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct IoTracker {
    state: Arc<Mutex<IoState>>,
}

impl IoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Per-device stats, busiest first.
    pub fn stats(&self) -> Vec<IoStat> {
        self.lock().sorted_stats()
    }

    /// Sum of all device rates, with its own high-water mark.
    pub fn total(&self) -> IoStat {
        let state = self.lock();
        IoStat {
            device_name: "total".to_string(),
            bytes_per_second: state.total_rate,
            high_watermark: state.total_high_watermark,
        }
    }

    pub fn record(&self, at: Instant, counters: IoCounters) {
        self.lock().update(at, counters);
    }

    pub fn sample(&self, source: &mut dyn IoSource) -> bool {
        match source.counters() {
            Ok(counters) => {
                self.record(Instant::now(), counters);
                true
            }
            Err(e) => {
                log::info!("Sampling I/O counters failed: {}", e);
                false
            }
        }
    }

    /// Sample forever. Readers poll [`IoTracker::stats`] when they redraw.
    pub fn run(&self, mut source: Box<dyn IoSource>) {
        loop {
            let started = Instant::now();
            self.sample(source.as_mut());
            std::thread::sleep(IO_SAMPLE_INTERVAL.saturating_sub(started.elapsed()));
        }
    }
}
