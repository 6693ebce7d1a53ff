//! Vruntime-ordered ready queue and the fairness policy built on it.
//!
//! Split into focused submodules:
//! - `queue`: index-linked ordered list threaded through registry slots
//! - `policy`: enqueue/dispatch/drain and the `MinVruntime` floor

mod policy;
mod queue;

pub use self::policy::VruntimeScheduler;
pub use self::queue::VruntimeQueue;
