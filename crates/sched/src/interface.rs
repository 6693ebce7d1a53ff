use std::sync::Arc;

use usched_core::{EnqueueRecord, ExitInfo, HookCounters, TaskId};

use crate::error::DispatchError;

/// Boundary to the privileged scheduling hook.
///
/// Implementations wrap whatever transport the hook exposes (shared maps,
/// an in-process simulation, a scripted test double). Every method must
/// return without blocking; only [`yield_cpu`](Self::yield_cpu) may give
/// the CPU away.
pub trait SchedulerInterface {
    /// Read and remove one pending enqueue report, if any.
    fn poll_enqueued(&mut self) -> Option<EnqueueRecord>;

    /// Hand a task back to the hook for execution.
    fn submit_dispatch(&mut self, pid: TaskId) -> Result<(), DispatchError>;

    /// Snapshot of the hook's classification counters.
    fn read_counters(&self) -> HookCounters;

    /// Whether the hook has asked the scheduler to terminate.
    fn shutdown_requested(&self) -> bool;

    /// Reason the hook gave for terminating. Only consulted after
    /// [`shutdown_requested`](Self::shutdown_requested) returns true.
    fn exit_info(&self) -> Option<ExitInfo>;

    /// Give the CPU back to the hook at the end of a loop cycle.
    fn yield_cpu(&mut self) {
        std::thread::yield_now();
    }
}

/// Read-only view of the hook counters, shareable with the reporter.
pub trait CounterSource: Send + Sync {
    fn read_counters(&self) -> HookCounters;
}

impl<T: CounterSource + ?Sized> CounterSource for Arc<T> {
    fn read_counters(&self) -> HookCounters {
        (**self).read_counters()
    }
}
