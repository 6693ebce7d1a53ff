use std::path::PathBuf;

use clap::Parser;

use usched_core::{SchedConfig, StatsFormat};
use usched_hook::SimConfig;

/// User-space vruntime scheduler.
///
/// Runs the scheduling loop against an in-process simulation of the
/// privileged hook and prints statistics until interrupted or until the
/// hook exits.
#[derive(Parser, Debug)]
#[command(name = "usched", version, about)]
pub struct CliArgs {
    /// Maximum number of tasks dispatched per loop cycle.
    #[arg(short = 'b', long = "batch")]
    pub batch_size: Option<u32>,

    /// Only route tasks on the ext policy to user space.
    #[arg(short = 'p', long)]
    pub partial: bool,

    /// Registry capacity; pids at or above this are rejected.
    #[arg(long)]
    pub max_tasks: Option<usize>,

    /// Statistics interval in milliseconds.
    #[arg(long)]
    pub stats_interval_ms: Option<u64>,

    /// Statistics output: table or json.
    #[arg(long)]
    pub stats_format: Option<StatsFormat>,

    /// Path to config file (default: ~/.config/usched/config.toml if present).
    #[arg(long, env = "USCHED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of simulated worker tasks.
    #[arg(long, env = "USCHED_SIM_TASKS")]
    pub sim_tasks: Option<usize>,

    /// Number of simulated CPUs.
    #[arg(long, env = "USCHED_SIM_CPUS")]
    pub sim_cpus: Option<usize>,

    /// Stop the simulation after this many ticks (0 runs until interrupted).
    #[arg(long, env = "USCHED_SIM_TICKS")]
    pub sim_ticks: Option<u64>,

    /// Simulated time slice in microseconds.
    #[arg(long, env = "USCHED_SIM_SLICE_US")]
    pub sim_slice_us: Option<u64>,

    /// Simulated tick length in microseconds.
    #[arg(long, env = "USCHED_SIM_TICK_US")]
    pub sim_tick_us: Option<u64>,
}

impl CliArgs {
    /// Flags given on the command line win over file and environment.
    pub fn apply(&self, config: &mut SchedConfig) {
        if let Some(batch) = self.batch_size {
            config.batch_size = batch;
        }
        if self.partial {
            config.partial = true;
        }
        if let Some(max) = self.max_tasks {
            config.max_tasks = max;
        }
        if let Some(ms) = self.stats_interval_ms {
            config.stats_interval_ms = ms;
        }
        if let Some(format) = self.stats_format {
            config.stats_format = format;
        }
    }

    /// Partial mode is on when either the scheduler settings or the `[sim]`
    /// table ask for it.
    pub fn apply_sim(&self, sim: &mut SimConfig, sched: &SchedConfig) {
        sim.partial |= sched.partial;
        if let Some(n) = self.sim_tasks {
            sim.nr_tasks = n;
        }
        if let Some(n) = self.sim_cpus {
            sim.nr_cpus = n;
        }
        if let Some(n) = self.sim_ticks {
            sim.ticks = n;
        }
        if let Some(us) = self.sim_slice_us {
            sim.slice_us = us;
        }
        if let Some(us) = self.sim_tick_us {
            sim.tick_us = us;
        }
    }
}
