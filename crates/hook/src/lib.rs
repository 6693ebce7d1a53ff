//! In-process stand-in for the privileged scheduling hook.
//!
//! [`attach`] builds a [`Simulator`] (the hook side: synthetic tasks,
//! virtual CPUs, classification counters, exit reporting) and the
//! [`HookInterface`] the control loop talks to. The two halves share only
//! two bounded channels, the counters and the exit slot.

pub mod config;
pub mod counters;
pub mod interface;
pub mod sim;
pub mod workload;

use std::sync::mpsc::sync_channel;
use std::sync::Arc;

use usched_core::UschedError;

pub use config::SimConfig;
pub use counters::{ExitSlot, HookStats};
pub use interface::HookInterface;
pub use sim::{SimHandle, Simulator};
pub use workload::{Phase, SimTask, SCHEDULER_PID};

/// Create both halves of a simulated hook.
pub fn attach(config: SimConfig) -> Result<(Simulator, HookInterface), UschedError> {
    config.validate()?;

    let (enqueue_tx, enqueue_rx) = sync_channel(config.queue_depth);
    let (dispatch_tx, dispatch_rx) = sync_channel(config.queue_depth);
    let counters = Arc::new(HookStats::new());
    let exit = Arc::new(ExitSlot::new());

    let iface = HookInterface::new(
        enqueue_rx,
        dispatch_tx,
        Arc::clone(&counters),
        Arc::clone(&exit),
        config.tick(),
    );
    let sim = Simulator::new(config, enqueue_tx, dispatch_rx, counters, exit);
    Ok((sim, iface))
}
