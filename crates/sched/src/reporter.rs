//! Periodic diagnostics output.
//!
//! The reporter never touches scheduling state. It reads the relaxed
//! counters in [`SchedStats`] and the hook's [`CounterSource`] on its own
//! task and prints a summary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;

use usched_core::StatsFormat;

use crate::interface::CounterSource;
use crate::stats::{SchedStats, StatsSnapshot};

pub struct Reporter {
    counters: Arc<dyn CounterSource>,
    stats: Arc<SchedStats>,
    format: StatsFormat,
    last_rejected: u64,
    last_failures: u64,
}

impl Reporter {
    pub fn new(counters: Arc<dyn CounterSource>, stats: Arc<SchedStats>, format: StatsFormat) -> Self {
        Self {
            counters,
            stats,
            format,
            last_rejected: 0,
            last_failures: 0,
        }
    }

    pub fn sample(&self) -> StatsSnapshot {
        self.stats.snapshot(self.counters.read_counters())
    }

    pub fn render(&self, snap: &StatsSnapshot) -> String {
        match self.format {
            StatsFormat::Table => snap.to_string(),
            StatsFormat::Json => match serde_json::to_string(snap) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "failed to serialize stats snapshot");
                    String::new()
                }
            },
        }
    }

    /// Sample, log any new rejections or lost dispatches, and render.
    pub fn report(&mut self) -> String {
        let snap = self.sample();

        let rejected = snap.nr_rejected();
        if rejected > self.last_rejected {
            warn!(
                new = rejected - self.last_rejected,
                out_of_range = snap.nr_rejected_out_of_range,
                regressed = snap.nr_rejected_regressed,
                "enqueue records rejected"
            );
            self.last_rejected = rejected;
        }
        if snap.nr_dispatch_failures > self.last_failures {
            warn!(
                new = snap.nr_dispatch_failures - self.last_failures,
                total = snap.nr_dispatch_failures,
                "dispatch submissions failed"
            );
            self.last_failures = snap.nr_dispatch_failures;
        }

        self.render(&snap)
    }
}

/// Spawn the reporter task. Prints one summary per `interval` until either
/// `shutdown` is set or `stop` flips to true.
pub fn spawn_reporter(
    mut reporter: Reporter,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    mut stop: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the first sample
        // covers a full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    let out = reporter.report();
                    if !out.is_empty() {
                        println!("{}\n", out);
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
