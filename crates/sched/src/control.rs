//! The drain, dispatch, yield cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use usched_core::{ExitInfo, ExitKind};

use crate::error::SchedError;
use crate::interface::SchedulerInterface;
use crate::vruntime::VruntimeScheduler;

/// Why [`ControlLoop::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The process-wide shutdown flag was set.
    Requested,
    /// The hook reported that it stopped.
    HookExited(ExitInfo),
}

/// Single-threaded scheduler loop. Sole writer of the registry and queue.
pub struct ControlLoop<I> {
    sched: VruntimeScheduler,
    iface: I,
    batch_size: usize,
    /// Shutdown signal.
    shutdown: Arc<AtomicBool>,
}

impl<I: SchedulerInterface> ControlLoop<I> {
    pub fn new(sched: VruntimeScheduler, iface: I, batch_size: u32) -> Self {
        Self {
            sched,
            iface,
            batch_size: batch_size.max(1) as usize,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned shutdown flag (e.g. set by a signal task).
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Get an Arc to the shutdown flag (for external shutdown signaling).
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the loop to stop at the start of its next cycle.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn scheduler(&self) -> &VruntimeScheduler {
        &self.sched
    }

    pub fn interface(&self) -> &I {
        &self.iface
    }

    pub fn into_parts(self) -> (VruntimeScheduler, I) {
        (self.sched, self.iface)
    }

    /// One drain + dispatch pass. Returns the number of tasks dispatched.
    pub fn cycle(&mut self) -> Result<usize, SchedError> {
        self.sched.drain(&mut self.iface);
        let dispatched = self.sched.dispatch(&mut self.iface, self.batch_size)?;
        self.sched.stats().record_cycle();
        Ok(dispatched)
    }

    fn exit_reason(&self) -> Option<LoopExit> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Some(LoopExit::Requested);
        }
        if self.iface.shutdown_requested() {
            let info = self.iface.exit_info().unwrap_or_else(|| {
                ExitInfo::new(ExitKind::Unregistered, "hook requested shutdown")
            });
            return Some(LoopExit::HookExited(info));
        }
        None
    }

    /// Run until the shutdown flag is set or the hook exits.
    ///
    /// Nothing inside the loop allocates or logs; both happen only on the
    /// way in and out.
    pub fn run(&mut self) -> Result<LoopExit, SchedError> {
        info!(
            batch_size = self.batch_size,
            capacity = self.sched.registry().capacity(),
            "scheduler loop starting"
        );

        let exit = loop {
            if let Some(exit) = self.exit_reason() {
                break exit;
            }
            if let Err(e) = self.cycle() {
                // A hook that exits mid-cycle closes its channels; report the
                // exit rather than the closed channel.
                if self.iface.shutdown_requested() {
                    if let Some(exit) = self.exit_reason() {
                        break exit;
                    }
                }
                warn!(error = %e, "scheduler loop aborted");
                return Err(e);
            }
            self.iface.yield_cpu();
        };

        match &exit {
            LoopExit::Requested => info!("scheduler loop stopped on request"),
            LoopExit::HookExited(info) => info!(kind = %info.kind, reason = %info.reason, "hook exited"),
        }
        Ok(exit)
    }
}
