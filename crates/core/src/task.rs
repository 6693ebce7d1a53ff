use std::fmt;

use serde::{Deserialize, Serialize};

/// Task identifier as reported by the hook. Doubles as the registry index.
pub type TaskId = i32;

/// Weight of a task at neutral priority.
pub const BASE_WEIGHT: u64 = 100;

/// Default number of registry slots (highest pid + 1 the scheduler tracks).
pub const DEFAULT_MAX_TASKS: usize = 8192;

/// One runnable-task report read from the hook's enqueue channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueRecord {
    pub pid: TaskId,
    /// Scheduling weight; `BASE_WEIGHT` is neutral.
    pub weight: u64,
    /// Total CPU time the task has consumed, in nanoseconds.
    pub sum_exec_runtime: u64,
}

/// Classification counters maintained by the hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCounters {
    /// Tasks the hook handled itself (pinned tasks, the scheduler itself).
    pub nr_kernel_enqueues: u64,
    /// Tasks routed out to user space.
    pub nr_user_enqueues: u64,
    /// Tasks that should have been routed but the channel was full.
    pub nr_failed_enqueues: u64,
}

impl HookCounters {
    pub fn total(&self) -> u64 {
        self.nr_kernel_enqueues + self.nr_user_enqueues + self.nr_failed_enqueues
    }
}

/// Why the hook stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitKind {
    /// Ran to completion.
    Done,
    /// Detached by the host (e.g. an operator unloaded it).
    Unregistered,
    /// The hook hit an error condition, such as a stalled task.
    Error,
}

impl ExitKind {
    pub fn is_error(self) -> bool {
        matches!(self, ExitKind::Error)
    }
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Done => write!(f, "done"),
            ExitKind::Unregistered => write!(f, "unregistered"),
            ExitKind::Error => write!(f, "error"),
        }
    }
}

/// Exit information published by the hook when it stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub kind: ExitKind,
    pub reason: String,
    pub message: Option<String>,
}

impl ExitInfo {
    pub fn new(kind: ExitKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EXIT ({}): {}", self.kind, self.reason)?;
        if let Some(msg) = &self.message {
            write!(f, " ({})", msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_total() {
        let c = HookCounters {
            nr_kernel_enqueues: 3,
            nr_user_enqueues: 5,
            nr_failed_enqueues: 1,
        };
        assert_eq!(c.total(), 9);
        assert_eq!(HookCounters::default().total(), 0);
    }

    #[test]
    fn exit_info_display() {
        let info = ExitInfo::new(ExitKind::Error, "runnable task stall")
            .with_message("pid 42 waited 500 ticks");
        assert_eq!(
            info.to_string(),
            "EXIT (error): runnable task stall (pid 42 waited 500 ticks)"
        );

        let done = ExitInfo::new(ExitKind::Done, "simulation complete");
        assert_eq!(done.to_string(), "EXIT (done): simulation complete");
    }

    #[test]
    fn only_error_kind_is_error() {
        assert!(ExitKind::Error.is_error());
        assert!(!ExitKind::Done.is_error());
        assert!(!ExitKind::Unregistered.is_error());
    }
}
