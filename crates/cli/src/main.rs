//! usched: user-space vruntime scheduler.
//!
//! Wires the scheduler loop to the simulated hook:
//! - the hook runs on its own thread and reports runnable tasks
//! - the control loop runs on a blocking thread until a signal or hook exit
//! - the reporter prints statistics on a tokio interval
//!
//! On the way out the hook is unregistered and its exit reason printed.
//! An error exit from the hook makes the process exit non-zero.

mod cli;
mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use usched_core::{ExitInfo, ExitKind, SchedConfig};
use usched_sched::{spawn_reporter, ControlLoop, LoopExit, Reporter, SchedStats, VruntimeScheduler};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    usched_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // ── Configuration ───────────────────────────────────────────────
    let config_path = config::resolve_config_path(args.config.clone());
    let mut sched_config = SchedConfig::load(config_path.as_deref())
        .context("failed to load scheduler configuration")?;
    args.apply(&mut sched_config);
    sched_config
        .validate()
        .context("invalid scheduler configuration")?;
    sched_config.log_summary();

    let mut sim_config = config::load_sim(config_path.as_deref())?;
    args.apply_sim(&mut sim_config, &sched_config);
    if sim_config.nr_tasks >= sched_config.max_tasks {
        warn!(
            sim_tasks = sim_config.nr_tasks,
            max_tasks = sched_config.max_tasks,
            "some simulated pids exceed the registry capacity and will be rejected"
        );
    }

    // ── Hook + scheduler ────────────────────────────────────────────
    let (sim, iface) = usched_hook::attach(sim_config).context("failed to attach hook")?;

    let stats = Arc::new(SchedStats::new());
    let reporter = Reporter::new(
        iface.counters(),
        Arc::clone(&stats),
        sched_config.stats_format,
    );
    let sched = VruntimeScheduler::from_config(&sched_config, Arc::clone(&stats));
    let mut ctl = ControlLoop::new(sched, iface, sched_config.batch_size);
    let shutdown = ctl.shutdown_signal();

    let hook = sim.spawn().context("failed to start hook thread")?;

    // ── Background tasks ────────────────────────────────────────────
    let (stop_tx, stop_rx) = watch::channel(false);
    let reporter_handle = spawn_reporter(
        reporter,
        sched_config.stats_interval(),
        Arc::clone(&shutdown),
        stop_rx,
    );
    tokio::spawn(watch_signals(Arc::clone(&shutdown)));

    // ── Run ─────────────────────────────────────────────────────────
    let outcome = tokio::task::spawn_blocking(move || ctl.run())
        .await
        .context("scheduler loop panicked")?;

    // The reporter may already have stopped on the shutdown flag.
    if stop_tx.send(true).is_err() {
        debug!("reporter already stopped");
    }
    if let Err(e) = reporter_handle.await {
        warn!(error = %e, "reporter task failed");
    }

    let detached = tokio::task::spawn_blocking(move || hook.detach())
        .await
        .context("hook thread panicked")?;

    info!(
        enqueues = stats.nr_vruntime_enqueues(),
        dispatches = stats.nr_vruntime_dispatches(),
        rejected = stats.nr_rejected(),
        lost = stats.nr_dispatch_failures(),
        "scheduler stopped"
    );

    let exit = outcome.context("scheduler loop failed")?;
    let info = match exit {
        LoopExit::HookExited(info) => info,
        LoopExit::Requested => detached.unwrap_or_else(|| {
            ExitInfo::new(ExitKind::Unregistered, "scheduler stopped on request")
        }),
    };

    println!("{}", info);
    if info.kind.is_error() {
        bail!("hook exited with error: {}", info.reason);
    }
    Ok(())
}

/// Set `shutdown` on the first SIGINT or SIGTERM.
async fn watch_signals(shutdown: Arc<AtomicBool>) {
    match os_signal().await {
        Ok(()) => {
            info!("shutdown signal received");
            shutdown.store(true, Ordering::Relaxed);
        }
        Err(e) => warn!(error = %e, "failed to listen for shutdown signals"),
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
async fn os_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
