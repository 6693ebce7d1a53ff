use usched_core::{TaskId, BASE_WEIGHT};

use crate::config::SimConfig;

/// Pid of the task standing in for the user-space scheduler itself.
pub const SCHEDULER_PID: TaskId = 0;

/// Weights handed out round-robin to the workers.
const WEIGHTS: [u64; 6] = [
    BASE_WEIGHT,
    BASE_WEIGHT,
    2 * BASE_WEIGHT,
    BASE_WEIGHT / 2,
    BASE_WEIGHT,
    4 * BASE_WEIGHT,
];

/// Where a simulated task currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Handled by the hook itself and waiting in the local FIFO.
    Local,
    /// Reported to user space at tick `since`, waiting for a dispatch.
    Routed { since: u64 },
    /// Running on a virtual CPU.
    Running { cpu: usize },
}

#[derive(Debug, Clone)]
pub struct SimTask {
    pub pid: TaskId,
    pub weight: u64,
    /// Affinity restricted to a single CPU.
    pub pinned: bool,
    /// Scheduled under the ext policy. Only matters in partial mode.
    pub ext_policy: bool,
    pub sum_exec_runtime: u64,
    pub phase: Phase,
}

impl SimTask {
    pub fn is_scheduler(&self) -> bool {
        self.pid == SCHEDULER_PID
    }
}

fn every(n: usize, i: usize) -> bool {
    n != 0 && i % n == 0
}

/// Build the scheduler task followed by `nr_tasks` workers; index equals pid.
pub fn build(config: &SimConfig) -> Vec<SimTask> {
    let mut tasks = Vec::with_capacity(config.nr_tasks + 1);
    tasks.push(SimTask {
        pid: SCHEDULER_PID,
        weight: BASE_WEIGHT,
        pinned: false,
        ext_policy: true,
        sum_exec_runtime: 0,
        phase: Phase::Local,
    });
    for i in 1..=config.nr_tasks {
        tasks.push(SimTask {
            pid: i as TaskId,
            weight: WEIGHTS[(i - 1) % WEIGHTS.len()],
            pinned: every(config.pinned_every, i),
            ext_policy: !every(config.foreign_every, i),
            sum_exec_runtime: 0,
            phase: Phase::Local,
        });
    }
    tasks
}
