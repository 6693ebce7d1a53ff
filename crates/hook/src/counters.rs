use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use usched_core::{ExitInfo, HookCounters};
use usched_sched::CounterSource;

/// Classification counters bumped by the hook on every wake-up.
#[derive(Debug, Default)]
pub struct HookStats {
    nr_kernel_enqueues: AtomicU64,
    nr_user_enqueues: AtomicU64,
    nr_failed_enqueues: AtomicU64,
}

impl HookStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_kernel(&self) {
        self.nr_kernel_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_user(&self) {
        self.nr_user_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.nr_failed_enqueues.fetch_add(1, Ordering::Relaxed);
    }
}

impl CounterSource for HookStats {
    fn read_counters(&self) -> HookCounters {
        HookCounters {
            nr_kernel_enqueues: self.nr_kernel_enqueues.load(Ordering::Relaxed),
            nr_user_enqueues: self.nr_user_enqueues.load(Ordering::Relaxed),
            nr_failed_enqueues: self.nr_failed_enqueues.load(Ordering::Relaxed),
        }
    }
}

/// Exit record published once by the hook and read by the scheduler.
///
/// `exited` is checked on every loop cycle; the lock is only taken on the
/// way out.
#[derive(Debug, Default)]
pub struct ExitSlot {
    exited: AtomicBool,
    info: RwLock<Option<ExitInfo>>,
}

impl ExitSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `info`. Only the first call has any effect.
    pub fn set(&self, info: ExitInfo) -> bool {
        let mut slot = self.info.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(info);
        self.exited.store(true, Ordering::Release);
        true
    }

    pub fn is_set(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    pub fn get(&self) -> Option<ExitInfo> {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
