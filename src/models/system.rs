/// System-wide numbers shown in the overview row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemOverview {
    pub load_avg_1: f64,
    pub load_avg_5: f64,
    pub load_avg_15: f64,
    pub logical_cpus: usize,
    pub physical_cpus: usize,
    /// RAM plus swap in use.
    pub used_memory_kb: u64,
    pub total_memory_kb: u64,
}

impl SystemOverview {
    /// One-minute load relative to the number of logical CPUs.
    pub fn load_fraction(&self) -> f64 {
        if self.logical_cpus == 0 {
            return 0.0;
        }
        (self.load_avg_1 / self.logical_cpus as f64).clamp(0.0, 1.0)
    }

    pub fn memory_fraction(&self) -> f64 {
        if self.total_memory_kb == 0 {
            return 0.0;
        }
        (self.used_memory_kb as f64 / self.total_memory_kb as f64).clamp(0.0, 1.0)
    }
}

/// Throughput of one I/O device direction, e.g. `eth0 in` or `sda1 write`.
#[derive(Debug, Clone, PartialEq)]
pub struct IoStat {
    pub device_name: String,
    pub bytes_per_second: f64,
    pub high_watermark: f64,
}

impl IoStat {
    pub fn fraction(&self) -> f64 {
        if self.high_watermark <= 0.0 {
            return 0.0;
        }
        (self.bytes_per_second / self.high_watermark).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fraction_relative_to_cores() {
        let overview = SystemOverview {
            load_avg_1: 2.0,
            logical_cpus: 8,
            ..Default::default()
        };
        assert!((overview.load_fraction() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn load_fraction_saturates() {
        let overview = SystemOverview {
            load_avg_1: 20.0,
            logical_cpus: 4,
            ..Default::default()
        };
        assert_eq!(overview.load_fraction(), 1.0);
    }

    #[test]
    fn fractions_handle_zero_totals() {
        let overview = SystemOverview::default();
        assert_eq!(overview.load_fraction(), 0.0);
        assert_eq!(overview.memory_fraction(), 0.0);

        let stat = IoStat {
            device_name: "sda".into(),
            bytes_per_second: 10.0,
            high_watermark: 0.0,
        };
        assert_eq!(stat.fraction(), 0.0);
    }
}
