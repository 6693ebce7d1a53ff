use thiserror::Error;

use usched_core::TaskId;

/// Local, recoverable rejection of a single enqueue record.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EnqueueError {
    #[error("task {pid} is outside the registry (capacity {capacity})")]
    OutOfRange { pid: TaskId, capacity: usize },

    #[error("task {pid} reported runtime {reported} below stored {stored}")]
    TimeRegressed { pid: TaskId, stored: u64, reported: u64 },
}

/// Failure handing a task back to the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Destination is full; try again next cycle.
    #[error("dispatch channel full")]
    Full,

    /// The hook side is gone.
    #[error("dispatch channel closed")]
    Closed,
}

impl DispatchError {
    pub fn is_transient(self) -> bool {
        matches!(self, DispatchError::Full)
    }
}

/// Fatal control loop errors.
#[derive(Debug, Error)]
pub enum SchedError {
    #[error("dispatch channel closed while submitting task {0}")]
    InterfaceClosed(TaskId),
}
