// src/config.rs
// =============================================================================
// Tunables for the crawler.
//
// The defaults match what the crawl has always used: 4 worker slots, 10
// profiles per provider call. The HTTP timeout only applies to the bundled
// HTTP provider; the core itself never times a provider call out.
// =============================================================================

use std::time::Duration;

/// Project id reserved for "problem" profiles in the reference catalog
pub const DEFAULT_PROBLEM_PROJECT: u64 = 10985;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutConfig {
    /// Batch workers allowed to run at once
    pub worker_slots: usize,
    /// Profiles per provider call
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub problem_project: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            worker_slots: 4,
            batch_size: 10,
            request_timeout: Duration::from_secs(30),
            problem_project: DEFAULT_PROBLEM_PROJECT,
        }
    }
}

impl ScoutConfig {
    // Zero would stall the scheduler, so both knobs are floored at one
    pub fn worker_slots(&self) -> usize {
        self.worker_slots.max(1)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScoutConfig::default();
        assert_eq!(config.worker_slots(), 4);
        assert_eq!(config.batch_size(), 10);
        assert_eq!(config.problem_project, 10985);
    }

    #[test]
    fn test_zero_values_are_floored() {
        let config = ScoutConfig {
            worker_slots: 0,
            batch_size: 0,
            ..ScoutConfig::default()
        };
        assert_eq!(config.worker_slots(), 1);
        assert_eq!(config.batch_size(), 1);
    }
}
