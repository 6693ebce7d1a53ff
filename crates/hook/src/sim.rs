//! Tick-driven model of the privileged half of the scheduler.
//!
//! Every tick the hook advances the tasks running on its virtual CPUs,
//! wakes the ones whose slice ran out, collects dispatches from user space
//! and fills idle CPUs from its local FIFO. Tasks it routes to user space
//! only run again once their pid comes back through the dispatch channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use usched_core::{EnqueueRecord, ExitInfo, ExitKind, TaskId, UschedError};

use crate::config::SimConfig;
use crate::counters::{ExitSlot, HookStats};
use crate::workload::{self, Phase, SimTask};

#[derive(Debug, Clone, Copy)]
struct Slice {
    task: usize,
    left_ns: u64,
}

pub struct Simulator {
    config: SimConfig,
    tasks: Vec<SimTask>,
    cpus: Vec<Option<Slice>>,
    /// Tasks ready to run: ones the hook handled itself and ones user
    /// space dispatched, in arrival order.
    local: VecDeque<usize>,
    enqueue_tx: SyncSender<EnqueueRecord>,
    dispatch_rx: Option<Receiver<TaskId>>,
    counters: Arc<HookStats>,
    exit: Arc<ExitSlot>,
    stop: Arc<AtomicBool>,
    now: u64,
    booted: bool,
}

impl Simulator {
    pub(crate) fn new(
        config: SimConfig,
        enqueue_tx: SyncSender<EnqueueRecord>,
        dispatch_rx: Receiver<TaskId>,
        counters: Arc<HookStats>,
        exit: Arc<ExitSlot>,
    ) -> Self {
        let tasks = workload::build(&config);
        let local = VecDeque::with_capacity(tasks.len());
        Self {
            cpus: vec![None; config.nr_cpus],
            config,
            tasks,
            local,
            enqueue_tx,
            dispatch_rx: Some(dispatch_rx),
            counters,
            exit,
            stop: Arc::new(AtomicBool::new(false)),
            now: 0,
            booted: false,
        }
    }

    /// Ticks elapsed so far.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn task(&self, pid: TaskId) -> Option<&SimTask> {
        usize::try_from(pid).ok().and_then(|idx| self.tasks.get(idx))
    }

    pub fn tasks(&self) -> &[SimTask] {
        &self.tasks
    }

    /// Pids currently on a CPU, by CPU index.
    pub fn running(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.cpus
            .iter()
            .flatten()
            .map(|slice| self.tasks[slice.task].pid)
    }

    pub fn exit_info(&self) -> Option<ExitInfo> {
        self.exit.get()
    }

    /// Ask the hook to unregister at its next tick.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Advance the model by one tick. Returns false once the hook has exited.
    pub fn tick(&mut self) -> bool {
        if self.exit.is_set() {
            return false;
        }
        if self.stop.load(Ordering::Relaxed) {
            self.finish(ExitInfo::new(
                ExitKind::Unregistered,
                "unregistered from the host",
            ));
            return false;
        }
        if self.config.ticks > 0 && self.now >= self.config.ticks {
            let info = ExitInfo::new(ExitKind::Done, "simulation complete")
                .with_message(format!("{} ticks on {} cpus", self.now, self.cpus.len()));
            self.finish(info);
            return false;
        }

        if !self.booted {
            self.boot();
        }
        self.run_cpus();
        if let Err(info) = self.pull_dispatched() {
            self.finish(info);
            return false;
        }
        self.fill_idle_cpus();
        if let Some(info) = self.check_stalls() {
            self.finish(info);
            return false;
        }

        self.now += 1;
        true
    }

    /// Run the hook on its own thread, one tick per `tick_us` of wall time.
    pub fn spawn(mut self) -> Result<SimHandle, UschedError> {
        let stop = Arc::clone(&self.stop);
        let exit = Arc::clone(&self.exit);
        let period = self.config.tick();

        let thread = std::thread::Builder::new()
            .name("usched-hook".into())
            .spawn(move || {
                while self.tick() {
                    std::thread::sleep(period);
                }
            })?;

        Ok(SimHandle { stop, exit, thread })
    }

    fn boot(&mut self) {
        info!(
            tasks = self.config.nr_tasks,
            cpus = self.cpus.len(),
            partial = self.config.partial,
            "hook attached"
        );
        for idx in 0..self.tasks.len() {
            self.wake(idx);
        }
        self.booted = true;
    }

    /// Classify a task that just became runnable.
    fn wake(&mut self, idx: usize) {
        let now = self.now;
        let task = &mut self.tasks[idx];

        let direct = task.is_scheduler()
            || task.pinned
            || (self.config.partial && !task.ext_policy);
        if direct {
            task.phase = Phase::Local;
            self.local.push_back(idx);
            self.counters.record_kernel();
            return;
        }

        let record = EnqueueRecord {
            pid: task.pid,
            weight: task.weight,
            sum_exec_runtime: task.sum_exec_runtime,
        };
        match self.enqueue_tx.try_send(record) {
            Ok(()) => {
                task.phase = Phase::Routed { since: now };
                self.counters.record_user();
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                task.phase = Phase::Local;
                self.local.push_back(idx);
                self.counters.record_failed();
            }
        }
    }

    fn run_cpus(&mut self) {
        let tick_ns = self.config.tick_ns();
        for cpu in 0..self.cpus.len() {
            let Some(mut slice) = self.cpus[cpu] else {
                continue;
            };
            self.tasks[slice.task].sum_exec_runtime += tick_ns;
            slice.left_ns = slice.left_ns.saturating_sub(tick_ns);

            if slice.left_ns == 0 {
                self.cpus[cpu] = None;
                self.wake(slice.task);
            } else {
                self.cpus[cpu] = Some(slice);
            }
        }
    }

    fn pull_dispatched(&mut self) -> Result<(), ExitInfo> {
        let Some(rx) = &self.dispatch_rx else {
            return Ok(());
        };

        loop {
            let pid = match rx.try_recv() {
                Ok(pid) => pid,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            };

            let Some(idx) = usize::try_from(pid).ok().filter(|idx| *idx < self.tasks.len()) else {
                return Err(ExitInfo::new(ExitKind::Error, "invalid dispatch")
                    .with_message(format!("pid {} is not a known task", pid)));
            };

            match self.tasks[idx].phase {
                Phase::Routed { .. } => {
                    self.tasks[idx].phase = Phase::Local;
                    self.local.push_back(idx);
                }
                phase => debug!(pid, ?phase, "ignoring dispatch of a task that is not waiting"),
            }
        }
    }

    fn fill_idle_cpus(&mut self) {
        let slice_ns = self.config.slice_ns();
        for cpu in 0..self.cpus.len() {
            if self.cpus[cpu].is_some() {
                continue;
            }
            let Some(idx) = self.local.pop_front() else {
                break;
            };
            self.tasks[idx].phase = Phase::Running { cpu };
            self.cpus[cpu] = Some(Slice {
                task: idx,
                left_ns: slice_ns,
            });
        }
    }

    fn check_stalls(&self) -> Option<ExitInfo> {
        let limit = self.config.stall_ticks;
        if limit == 0 {
            return None;
        }
        self.tasks.iter().find_map(|task| match task.phase {
            Phase::Routed { since } if self.now - since >= limit => Some(
                ExitInfo::new(ExitKind::Error, "runnable task stall").with_message(format!(
                    "pid {} not dispatched for {} ticks",
                    task.pid,
                    self.now - since
                )),
            ),
            _ => None,
        })
    }

    /// Publish the exit and disconnect the dispatch channel.
    fn finish(&mut self, info: ExitInfo) {
        if info.kind.is_error() {
            warn!(tick = self.now, reason = %info.reason, "hook exiting with error");
        } else {
            info!(tick = self.now, kind = %info.kind, "hook exiting");
        }
        self.exit.set(info);
        self.dispatch_rx = None;
    }
}

/// Owner-side handle to a hook running on its own thread.
pub struct SimHandle {
    stop: Arc<AtomicBool>,
    exit: Arc<ExitSlot>,
    thread: JoinHandle<()>,
}

impl SimHandle {
    /// Unregister the hook and wait for its thread. Returns whichever exit
    /// was published first; a hook that already stopped keeps its reason.
    pub fn detach(self) -> Option<ExitInfo> {
        self.stop.store(true, Ordering::Relaxed);
        if self.thread.join().is_err() {
            warn!("hook thread panicked");
        }
        self.exit.get()
    }
}
