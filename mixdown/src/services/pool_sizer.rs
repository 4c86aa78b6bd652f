//! Worker pool sizing
//!
//! Picks the transcode parallelism from the total input volume and the
//! number of processing units on the host.

use mixdown_common::config::WorkerCount;

/// Size thresholds (in MB) at which parallelism steps down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSizer {
    /// At or above this size, use half the units
    pub heavy_threshold_mb: f64,
    /// At or above this size (and below heavy), leave one unit free
    pub moderate_threshold_mb: f64,
}

impl Default for PoolSizer {
    fn default() -> Self {
        Self {
            heavy_threshold_mb: 1000.0,
            moderate_threshold_mb: 500.0,
        }
    }
}

impl PoolSizer {
    /// Worker count for `total_mb` of input on a host with `units` cores.
    /// Always at least 1.
    pub fn worker_count(&self, total_mb: f64, units: usize) -> usize {
        if total_mb >= self.heavy_threshold_mb {
            (units / 2).max(1)
        } else if total_mb >= self.moderate_threshold_mb {
            units.saturating_sub(1).max(2)
        } else {
            units.max(1)
        }
    }

    /// Resolve a requested [`WorkerCount`]; explicit counts bypass sizing
    pub fn resolve(&self, requested: WorkerCount, total_mb: f64, units: usize) -> usize {
        match requested {
            WorkerCount::Fixed(n) => n.max(1),
            WorkerCount::Auto => self.worker_count(total_mb, units),
        }
    }
}

/// Processing units available on this host
pub fn available_units() -> usize {
    num_cpus::get().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        let sizer = PoolSizer::default();
        assert_eq!(sizer.worker_count(1000.0, 8), 4);
        assert_eq!(sizer.worker_count(999.0, 8), 7);
        assert_eq!(sizer.worker_count(500.0, 8), 7);
        assert_eq!(sizer.worker_count(499.0, 8), 8);
    }

    #[test]
    fn test_monotonic_in_size() {
        let sizer = PoolSizer::default();
        for units in 1..=32 {
            let heavy = sizer.worker_count(1200.0, units);
            let moderate = sizer.worker_count(800.0, units);
            let light = sizer.worker_count(300.0, units);
            assert!(heavy <= moderate, "units={units}: {heavy} > {moderate}");
            // Single-core hosts get the floor of 2 in the moderate band
            if units >= 2 {
                assert!(moderate <= light, "units={units}: {moderate} > {light}");
            }
        }
    }

    #[test]
    fn test_floors() {
        let sizer = PoolSizer::default();
        assert_eq!(sizer.worker_count(5000.0, 1), 1);
        assert_eq!(sizer.worker_count(700.0, 1), 2);
        assert_eq!(sizer.worker_count(700.0, 2), 2);
        assert_eq!(sizer.worker_count(10.0, 0), 1);
    }

    #[test]
    fn test_explicit_count_bypasses_sizing() {
        let sizer = PoolSizer::default();
        assert_eq!(sizer.resolve(WorkerCount::Fixed(64), 5000.0, 4), 64);
        assert_eq!(sizer.resolve(WorkerCount::Fixed(0), 10.0, 4), 1);
        assert_eq!(sizer.resolve(WorkerCount::Auto, 10.0, 4), 4);
    }

    #[test]
    fn test_custom_thresholds() {
        let sizer = PoolSizer {
            heavy_threshold_mb: 100.0,
            moderate_threshold_mb: 10.0,
        };
        assert_eq!(sizer.worker_count(150.0, 8), 4);
        assert_eq!(sizer.worker_count(50.0, 8), 7);
        assert_eq!(sizer.worker_count(5.0, 8), 8);
    }
}
