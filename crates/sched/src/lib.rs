//! User-space half of a split-level vruntime scheduler.
//!
//! The privileged hook reports runnable tasks through an enqueue channel.
//! [`ControlLoop`] drains those reports into a fixed-capacity
//! [`TaskRegistry`], orders them by weighted vruntime in a
//! [`VruntimeQueue`], and hands batches back through the dispatch channel.
//! A [`Reporter`] samples counters from a separate task.

pub mod control;
pub mod error;
pub mod interface;
pub mod registry;
pub mod reporter;
pub mod stats;
pub mod vruntime;

pub use control::{ControlLoop, LoopExit};
pub use error::{DispatchError, EnqueueError, SchedError};
pub use interface::{CounterSource, SchedulerInterface};
pub use registry::{TaskRegistry, TaskState};
pub use reporter::{Reporter, spawn_reporter};
pub use stats::{SchedStats, StatsSnapshot};
pub use vruntime::{VruntimeQueue, VruntimeScheduler};
