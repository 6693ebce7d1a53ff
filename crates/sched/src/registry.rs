//! Fixed-capacity task registry indexed directly by task id.
//!
//! Every slot is allocated up front; the hot path only refreshes slot
//! contents. Queue linkage lives inside the slots so that ordering the
//! ready set never allocates either.

use usched_core::TaskId;

use crate::error::EnqueueError;

/// Per-task scheduling state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskState {
    /// Last `sum_exec_runtime` reported for this slot.
    pub sum_exec_runtime: u64,
    pub vruntime: f64,
    /// Set once the slot has received its first enqueue record.
    pub populated: bool,
    pub(crate) queued: bool,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl TaskState {
    const EMPTY: TaskState = TaskState {
        sum_exec_runtime: 0,
        vruntime: 0.0,
        populated: false,
        queued: false,
        prev: None,
        next: None,
    };

    /// Whether the task is currently linked into the ready queue.
    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

#[derive(Debug)]
pub struct TaskRegistry {
    slots: Box<[TaskState]>,
}

impl TaskRegistry {
    /// Preallocate `capacity` zeroed slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![TaskState::EMPTY; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bounds-check a task id and return its slot index.
    pub fn slot_of(&self, pid: TaskId) -> Result<u32, EnqueueError> {
        match usize::try_from(pid) {
            Ok(idx) if idx < self.slots.len() => Ok(idx as u32),
            _ => Err(EnqueueError::OutOfRange {
                pid,
                capacity: self.slots.len(),
            }),
        }
    }

    pub fn get(&self, pid: TaskId) -> Option<&TaskState> {
        let idx = self.slot_of(pid).ok()?;
        Some(&self.slots[idx as usize])
    }

    pub(crate) fn slot(&self, idx: u32) -> &TaskState {
        &self.slots[idx as usize]
    }

    pub(crate) fn slot_mut(&mut self, idx: u32) -> &mut TaskState {
        &mut self.slots[idx as usize]
    }
}
