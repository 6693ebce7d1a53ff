use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use usched_core::{EnqueueRecord, ExitInfo, HookCounters, TaskId};
use usched_sched::{CounterSource, DispatchError, SchedulerInterface};

use crate::counters::{ExitSlot, HookStats};

/// Scheduler-side end of the simulated hook's channels.
pub struct HookInterface {
    enqueue_rx: Receiver<EnqueueRecord>,
    dispatch_tx: SyncSender<TaskId>,
    /// Record received while parked in `yield_cpu`, handed out first.
    pending: Option<EnqueueRecord>,
    counters: Arc<HookStats>,
    exit: Arc<ExitSlot>,
    park: Duration,
}

impl HookInterface {
    pub(crate) fn new(
        enqueue_rx: Receiver<EnqueueRecord>,
        dispatch_tx: SyncSender<TaskId>,
        counters: Arc<HookStats>,
        exit: Arc<ExitSlot>,
        park: Duration,
    ) -> Self {
        Self {
            enqueue_rx,
            dispatch_tx,
            pending: None,
            counters,
            exit,
            park,
        }
    }

    /// Counter handle for the reporter.
    pub fn counters(&self) -> Arc<HookStats> {
        Arc::clone(&self.counters)
    }
}

impl SchedulerInterface for HookInterface {
    fn poll_enqueued(&mut self) -> Option<EnqueueRecord> {
        if let Some(record) = self.pending.take() {
            return Some(record);
        }
        match self.enqueue_rx.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn submit_dispatch(&mut self, pid: TaskId) -> Result<(), DispatchError> {
        self.dispatch_tx.try_send(pid).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::Full,
            TrySendError::Disconnected(_) => DispatchError::Closed,
        })
    }

    fn read_counters(&self) -> HookCounters {
        self.counters.read_counters()
    }

    fn shutdown_requested(&self) -> bool {
        self.exit.is_set()
    }

    fn exit_info(&self) -> Option<ExitInfo> {
        self.exit.get()
    }

    /// Park for at most one hook tick, waking early when a task is
    /// reported.
    fn yield_cpu(&mut self) {
        if self.pending.is_some() || self.exit.is_set() {
            return;
        }
        match self.enqueue_rx.recv_timeout(self.park) {
            Ok(record) => self.pending = Some(record),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
    }
}
