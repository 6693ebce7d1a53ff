use std::time::Duration;

use serde::{Deserialize, Serialize};

use usched_core::UschedError;

/// Shape of the simulated workload and machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of synthetic worker tasks (pids `1..=nr_tasks`).
    #[serde(default = "default_nr_tasks")]
    pub nr_tasks: usize,
    /// Number of virtual CPUs.
    #[serde(default = "default_nr_cpus")]
    pub nr_cpus: usize,
    /// Stop with `ExitKind::Done` after this many ticks. Zero runs until
    /// the host detaches the hook.
    #[serde(default)]
    pub ticks: u64,
    /// Length of one time slice in microseconds.
    #[serde(default = "default_slice_us")]
    pub slice_us: u64,
    /// Simulated time per tick in microseconds. Also the wall-clock period
    /// of the hook thread.
    #[serde(default = "default_tick_us")]
    pub tick_us: u64,
    /// A user-routed task left undispatched this many ticks trips the
    /// watchdog. Zero disables the watchdog.
    #[serde(default = "default_stall_ticks")]
    pub stall_ticks: u64,
    /// Capacity of the enqueue and dispatch channels.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Every n-th worker is pinned to a single CPU. Zero pins none.
    #[serde(default)]
    pub pinned_every: usize,
    /// Every n-th worker is not on the ext policy. Zero puts all on it.
    #[serde(default = "default_foreign_every")]
    pub foreign_every: usize,
    /// Only route tasks on the ext policy to user space.
    #[serde(default)]
    pub partial: bool,
}

fn default_nr_tasks() -> usize {
    16
}

fn default_nr_cpus() -> usize {
    4
}

fn default_slice_us() -> u64 {
    20_000
}

fn default_tick_us() -> u64 {
    1_000
}

fn default_stall_ticks() -> u64 {
    5_000
}

fn default_queue_depth() -> usize {
    usched_core::DEFAULT_MAX_TASKS
}

fn default_foreign_every() -> usize {
    4
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nr_tasks: default_nr_tasks(),
            nr_cpus: default_nr_cpus(),
            ticks: 0,
            slice_us: default_slice_us(),
            tick_us: default_tick_us(),
            stall_ticks: default_stall_ticks(),
            queue_depth: default_queue_depth(),
            pinned_every: 0,
            foreign_every: default_foreign_every(),
            partial: false,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), UschedError> {
        if self.nr_cpus == 0 {
            return Err(UschedError::Config("nr_cpus must be at least 1".into()));
        }
        if self.tick_us == 0 {
            return Err(UschedError::Config("tick_us must be at least 1".into()));
        }
        if self.slice_us < self.tick_us {
            return Err(UschedError::Config(format!(
                "slice_us ({}) must not be shorter than tick_us ({})",
                self.slice_us, self.tick_us
            )));
        }
        if self.queue_depth == 0 {
            return Err(UschedError::Config("queue_depth must be at least 1".into()));
        }
        if self.nr_tasks >= i32::MAX as usize {
            return Err(UschedError::Config(format!(
                "nr_tasks ({}) does not fit the pid range",
                self.nr_tasks
            )));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_micros(self.tick_us)
    }

    pub fn tick_ns(&self) -> u64 {
        self.tick_us.saturating_mul(1_000)
    }

    pub fn slice_ns(&self) -> u64 {
        self.slice_us.saturating_mul(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slice_ns(), 20_000_000);
        assert_eq!(config.tick(), Duration::from_millis(1));
    }

    #[test]
    fn rejects_degenerate_machines() {
        let no_cpus = SimConfig {
            nr_cpus: 0,
            ..SimConfig::default()
        };
        assert!(no_cpus.validate().is_err());

        let short_slice = SimConfig {
            slice_us: 10,
            tick_us: 100,
            ..SimConfig::default()
        };
        let err = short_slice.validate().unwrap_err();
        assert!(err.to_string().contains("slice_us"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: SimConfig = toml::from_str("nr_tasks = 3\npartial = true").unwrap();
        assert_eq!(config.nr_tasks, 3);
        assert!(config.partial);
        assert_eq!(config.nr_cpus, 4);
        assert_eq!(config.stall_ticks, 5_000);
    }
}
