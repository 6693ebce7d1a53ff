use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use usched_core::HookCounters;

/// Counters written by the control loop and read by the reporter.
///
/// Every field is a relaxed atomic. Apart from the queue depth and the
/// vruntime floor, all values only ever grow, so a reader racing the loop
/// sees slightly stale but never torn numbers.
#[derive(Debug, Default)]
pub struct SchedStats {
    nr_vruntime_enqueues: AtomicU64,
    nr_vruntime_dispatches: AtomicU64,
    nr_rejected_out_of_range: AtomicU64,
    nr_rejected_regressed: AtomicU64,
    nr_dispatch_failures: AtomicU64,
    nr_known_tasks: AtomicU64,
    nr_cycles: AtomicU64,
    nr_queued: AtomicU64,
    /// `f64::to_bits` of the current `MinVruntime`.
    min_vruntime_bits: AtomicU64,
}

impl SchedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueue(&self) {
        self.nr_vruntime_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.nr_vruntime_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out_of_range(&self) {
        self.nr_rejected_out_of_range.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_regressed(&self) {
        self.nr_rejected_regressed.fetch_add(1, Ordering::Relaxed);
    }

    /// A popped task that could not be submitted.
    pub fn record_dispatch_failure(&self) {
        self.nr_dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_new_task(&self) {
        self.nr_known_tasks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self) {
        self.nr_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publish_queue(&self, queued: usize, min_vruntime: f64) {
        self.nr_queued.store(queued as u64, Ordering::Relaxed);
        self.min_vruntime_bits
            .store(min_vruntime.to_bits(), Ordering::Relaxed);
    }

    pub fn nr_vruntime_enqueues(&self) -> u64 {
        self.nr_vruntime_enqueues.load(Ordering::Relaxed)
    }

    pub fn nr_vruntime_dispatches(&self) -> u64 {
        self.nr_vruntime_dispatches.load(Ordering::Relaxed)
    }

    pub fn nr_rejected(&self) -> u64 {
        self.nr_rejected_out_of_range.load(Ordering::Relaxed)
            + self.nr_rejected_regressed.load(Ordering::Relaxed)
    }

    pub fn nr_dispatch_failures(&self) -> u64 {
        self.nr_dispatch_failures.load(Ordering::Relaxed)
    }

    pub fn nr_cycles(&self) -> u64 {
        self.nr_cycles.load(Ordering::Relaxed)
    }

    /// Combine the loop's counters with the hook's into one snapshot.
    pub fn snapshot(&self, hook: HookCounters) -> StatsSnapshot {
        StatsSnapshot {
            taken_at: Utc::now(),
            hook,
            nr_vruntime_enqueues: self.nr_vruntime_enqueues(),
            nr_vruntime_dispatches: self.nr_vruntime_dispatches(),
            nr_rejected_out_of_range: self.nr_rejected_out_of_range.load(Ordering::Relaxed),
            nr_rejected_regressed: self.nr_rejected_regressed.load(Ordering::Relaxed),
            nr_dispatch_failures: self.nr_dispatch_failures(),
            nr_known_tasks: self.nr_known_tasks.load(Ordering::Relaxed),
            nr_cycles: self.nr_cycles(),
            nr_queued: self.nr_queued.load(Ordering::Relaxed),
            min_vruntime: f64::from_bits(self.min_vruntime_bits.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time view rendered by the reporter.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub hook: HookCounters,
    pub nr_vruntime_enqueues: u64,
    pub nr_vruntime_dispatches: u64,
    pub nr_rejected_out_of_range: u64,
    pub nr_rejected_regressed: u64,
    pub nr_dispatch_failures: u64,
    pub nr_known_tasks: u64,
    pub nr_cycles: u64,
    pub nr_queued: u64,
    pub min_vruntime: f64,
}

impl StatsSnapshot {
    pub fn nr_rejected(&self) -> u64 {
        self.nr_rejected_out_of_range + self.nr_rejected_regressed
    }
}

const BORDER: &str = "o-----------------------o";
const RULE: &str = "|-----------------------|";

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: u64) -> fmt::Result {
    writeln!(f, "|  {:<9}{:>11} |", label, value)
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", BORDER)?;
        writeln!(f, "| HOOK ENQUEUES         |")?;
        writeln!(f, "{}", RULE)?;
        row(f, "kern:", self.hook.nr_kernel_enqueues)?;
        row(f, "user:", self.hook.nr_user_enqueues)?;
        row(f, "failed:", self.hook.nr_failed_enqueues)?;
        writeln!(f, "|  -------------------- |")?;
        row(f, "total:", self.hook.total())?;
        writeln!(f, "|                       |")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "| VRUNTIME / USER       |")?;
        writeln!(f, "{}", RULE)?;
        row(f, "enq:", self.nr_vruntime_enqueues)?;
        row(f, "disp:", self.nr_vruntime_dispatches)?;
        row(f, "reject:", self.nr_rejected())?;
        row(f, "lost:", self.nr_dispatch_failures)?;
        row(f, "queued:", self.nr_queued)?;
        row(f, "tasks:", self.nr_known_tasks)?;
        row(f, "min_vrt:", self.min_vruntime as u64)?;
        write!(f, "{}", BORDER)
    }
}
