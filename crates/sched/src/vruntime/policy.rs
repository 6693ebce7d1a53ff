use std::sync::Arc;

use usched_core::{EnqueueRecord, SchedConfig, TaskId};

use crate::error::{EnqueueError, SchedError};
use crate::interface::SchedulerInterface;
use crate::registry::{TaskRegistry, TaskState};
use crate::stats::SchedStats;

use super::queue::VruntimeQueue;

/// Weighted-vruntime fairness policy over a fixed task registry.
///
/// Owns the registry, the ready queue and the `MinVruntime` floor. Nothing
/// here allocates after construction.
#[derive(Debug)]
pub struct VruntimeScheduler {
    registry: TaskRegistry,
    queue: VruntimeQueue,
    /// Vruntime of the most recently dispatched task; never decreases.
    min_vruntime: f64,
    base_weight: f64,
    stats: Arc<SchedStats>,
}

impl VruntimeScheduler {
    pub fn new(capacity: usize, base_weight: u64, stats: Arc<SchedStats>) -> Self {
        Self {
            registry: TaskRegistry::with_capacity(capacity),
            queue: VruntimeQueue::new(),
            min_vruntime: 0.0,
            base_weight: base_weight.max(1) as f64,
            stats,
        }
    }

    pub fn from_config(config: &SchedConfig, stats: Arc<SchedStats>) -> Self {
        Self::new(config.max_tasks, config.base_weight, stats)
    }

    pub fn min_vruntime(&self) -> f64 {
        self.min_vruntime
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &VruntimeQueue {
        &self.queue
    }

    pub fn stats(&self) -> &Arc<SchedStats> {
        &self.stats
    }

    pub fn task(&self, pid: TaskId) -> Option<&TaskState> {
        self.registry.get(pid)
    }

    /// Queued task ids in dispatch order.
    pub fn queued_pids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.queue.iter(&self.registry).map(|idx| idx as TaskId)
    }

    /// Vruntime accrued by running `delta` ns at `weight`.
    ///
    /// A weight of zero counts as 1 so the result stays finite.
    pub fn vruntime_delta(&self, weight: u64, delta: u64) -> f64 {
        let scale = weight.max(1) as f64 / self.base_weight;
        delta as f64 / scale
    }

    /// Fold one enqueue report into the task's state and (re)queue it.
    ///
    /// Rejected records leave the slot untouched and are counted in the
    /// shared stats.
    pub fn enqueue(&mut self, record: &EnqueueRecord) -> Result<(), EnqueueError> {
        let idx = match self.registry.slot_of(record.pid) {
            Ok(idx) => idx,
            Err(e) => {
                self.stats.record_out_of_range();
                return Err(e);
            }
        };

        let stored = *self.registry.slot(idx);
        if record.sum_exec_runtime < stored.sum_exec_runtime {
            self.stats.record_regressed();
            return Err(EnqueueError::TimeRegressed {
                pid: record.pid,
                stored: stored.sum_exec_runtime,
                reported: record.sum_exec_runtime,
            });
        }

        let delta = record.sum_exec_runtime - stored.sum_exec_runtime;
        let mut vruntime = stored.vruntime + self.vruntime_delta(record.weight, delta);
        if vruntime < self.min_vruntime {
            vruntime = self.min_vruntime;
        }

        if stored.queued {
            self.queue.unlink(&mut self.registry, idx);
        }

        let slot = self.registry.slot_mut(idx);
        if !slot.populated {
            slot.populated = true;
            self.stats.record_new_task();
        }
        slot.vruntime = vruntime;
        slot.sum_exec_runtime = record.sum_exec_runtime;

        self.queue.insert(&mut self.registry, idx);
        self.stats.record_enqueue();
        self.stats.publish_queue(self.queue.len(), self.min_vruntime);
        Ok(())
    }

    /// Pop up to `batch_size` tasks from the head and submit them.
    ///
    /// A transient submission failure ends the batch early; the task that
    /// was being submitted has already been unlinked and is not re-queued.
    /// It comes back with its next enqueue report. A closed channel is fatal.
    pub fn dispatch<I>(&mut self, iface: &mut I, batch_size: usize) -> Result<usize, SchedError>
    where
        I: SchedulerInterface + ?Sized,
    {
        let mut dispatched = 0;

        while dispatched < batch_size {
            let Some(idx) = self.queue.pop_front(&mut self.registry) else {
                break;
            };

            let vruntime = self.registry.slot(idx).vruntime;
            if vruntime > self.min_vruntime {
                self.min_vruntime = vruntime;
            }

            let pid = idx as TaskId;
            match iface.submit_dispatch(pid) {
                Ok(()) => {
                    dispatched += 1;
                    self.stats.record_dispatch();
                }
                Err(e) => {
                    self.stats.record_dispatch_failure();
                    if e.is_transient() {
                        break;
                    }
                    self.stats.publish_queue(self.queue.len(), self.min_vruntime);
                    return Err(SchedError::InterfaceClosed(pid));
                }
            }
        }

        self.stats.publish_queue(self.queue.len(), self.min_vruntime);
        Ok(dispatched)
    }

    /// Feed every pending enqueue report into [`enqueue`](Self::enqueue).
    ///
    /// Returns the number of records accepted. Rejections are counted by
    /// `enqueue` and do not stop the drain.
    pub fn drain<I>(&mut self, iface: &mut I) -> usize
    where
        I: SchedulerInterface + ?Sized,
    {
        let mut accepted = 0;
        while let Some(record) = iface.poll_enqueued() {
            if self.enqueue(&record).is_ok() {
                accepted += 1;
            }
        }
        accepted
    }
}
