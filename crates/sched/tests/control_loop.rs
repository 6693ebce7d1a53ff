//! Integration tests for the control loop driven by a scripted hook:
//! multi-cycle ordering, batching, shutdown paths and fatal dispatch errors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use usched_core::{EnqueueRecord, ExitInfo, ExitKind, HookCounters, SchedConfig, TaskId, BASE_WEIGHT};
use usched_sched::{
    ControlLoop, DispatchError, LoopExit, SchedError, SchedStats, SchedulerInterface,
    VruntimeScheduler,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Replays one round of enqueue records per loop cycle. Each `yield_cpu`
/// advances to the next round; once the script runs out the hook exits.
struct ScriptedHook {
    rounds: VecDeque<Vec<EnqueueRecord>>,
    current: VecDeque<EnqueueRecord>,
    dispatched: Vec<Vec<TaskId>>,
    exit: Option<ExitInfo>,
    exit_when_done: bool,
    close_after: Option<usize>,
    /// Publish an exit at the moment the dispatch channel closes.
    exit_on_close: bool,
    total_dispatched: usize,
    yields: usize,
}

impl ScriptedHook {
    fn new(rounds: Vec<Vec<EnqueueRecord>>) -> Self {
        let mut rounds: VecDeque<_> = rounds.into();
        let current = rounds.pop_front().unwrap_or_default().into();
        Self {
            rounds,
            current,
            dispatched: vec![Vec::new()],
            exit: None,
            exit_when_done: true,
            close_after: None,
            exit_on_close: false,
            total_dispatched: 0,
            yields: 0,
        }
    }

    fn all_dispatched(&self) -> Vec<TaskId> {
        self.dispatched.iter().flatten().copied().collect()
    }
}

impl SchedulerInterface for ScriptedHook {
    fn poll_enqueued(&mut self) -> Option<EnqueueRecord> {
        self.current.pop_front()
    }

    fn submit_dispatch(&mut self, pid: TaskId) -> Result<(), DispatchError> {
        if let Some(limit) = self.close_after {
            if self.total_dispatched >= limit {
                if self.exit_on_close {
                    self.exit = Some(ExitInfo::new(ExitKind::Unregistered, "detached"));
                }
                return Err(DispatchError::Closed);
            }
        }
        self.total_dispatched += 1;
        if let Some(round) = self.dispatched.last_mut() {
            round.push(pid);
        }
        Ok(())
    }

    fn read_counters(&self) -> HookCounters {
        HookCounters {
            nr_user_enqueues: self.total_dispatched as u64,
            ..HookCounters::default()
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.exit.is_some()
    }

    fn exit_info(&self) -> Option<ExitInfo> {
        self.exit.clone()
    }

    fn yield_cpu(&mut self) {
        self.yields += 1;
        match self.rounds.pop_front() {
            Some(next) => self.current = next.into(),
            None if self.exit_when_done => {
                self.exit = Some(ExitInfo::new(ExitKind::Done, "script finished"));
            }
            None => {}
        }
        self.dispatched.push(Vec::new());
    }
}

fn rec(pid: TaskId, weight: u64, sum_exec_runtime: u64) -> EnqueueRecord {
    EnqueueRecord { pid, weight, sum_exec_runtime }
}

fn make_loop(hook: ScriptedHook, batch: u32) -> ControlLoop<ScriptedHook> {
    let config = SchedConfig {
        max_tasks: 64,
        ..SchedConfig::default()
    };
    let sched = VruntimeScheduler::from_config(&config, Arc::new(SchedStats::new()));
    ControlLoop::new(sched, hook, batch)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn runs_until_hook_exits_and_surfaces_reason() {
    let hook = ScriptedHook::new(vec![
        vec![rec(1, BASE_WEIGHT, 100), rec(2, BASE_WEIGHT, 50)],
        vec![],
    ]);
    let mut ctl = make_loop(hook, 8);

    let exit = ctl.run().unwrap();
    assert_eq!(
        exit,
        LoopExit::HookExited(ExitInfo::new(ExitKind::Done, "script finished"))
    );

    let (sched, hook) = ctl.into_parts();
    assert_eq!(hook.dispatched[0], vec![2, 1]);
    assert_eq!(sched.min_vruntime(), 100.0);
    assert!(sched.queue().is_empty());
}

#[test]
fn batches_carry_over_between_cycles() {
    let first: Vec<_> = (0..5).map(|pid| rec(pid, BASE_WEIGHT, 10 * (pid as u64 + 1))).collect();
    let hook = ScriptedHook::new(vec![first, vec![], vec![]]);
    let mut ctl = make_loop(hook, 2);

    ctl.run().unwrap();
    let (sched, hook) = ctl.into_parts();
    assert_eq!(hook.dispatched[0], vec![0, 1]);
    assert_eq!(hook.dispatched[1], vec![2, 3]);
    assert_eq!(hook.dispatched[2], vec![4]);
    assert_eq!(sched.stats().nr_cycles(), 3);
}

#[test]
fn heavier_task_gets_more_dispatches() {
    // Two tasks run the same slice every time they are dispatched; task 1
    // has twice the weight so it should be picked about twice as often.
    let mut rounds = Vec::new();
    let (mut heavy_rt, mut light_rt) = (0u64, 0u64);
    rounds.push(vec![rec(1, 2 * BASE_WEIGHT, 0), rec(2, BASE_WEIGHT, 0)]);
    for _ in 0..200 {
        rounds.push(Vec::new());
    }
    let hook = ScriptedHook::new(rounds);
    let mut ctl = make_loop(hook, 1);

    // Drive cycles by hand so each dispatched task can be re-reported.
    let mut heavy = 0;
    let mut light = 0;
    for _ in 0..150 {
        ctl.cycle().unwrap();
        let last = ctl.interface().dispatched.last().cloned().unwrap_or_default();
        let mut next = Vec::new();
        for pid in last {
            if pid == 1 {
                heavy += 1;
                heavy_rt += 1000;
                next.push(rec(1, 2 * BASE_WEIGHT, heavy_rt));
            } else {
                light += 1;
                light_rt += 1000;
                next.push(rec(2, BASE_WEIGHT, light_rt));
            }
        }
        let (sched, mut hook) = ctl.into_parts();
        hook.rounds.push_front(next);
        hook.yield_cpu();
        ctl = ControlLoop::new(sched, hook, 1);
    }

    assert_eq!(heavy + light, 150);
    let ratio = heavy as f64 / light as f64;
    assert!((1.8..=2.2).contains(&ratio), "heavy={} light={}", heavy, light);
}

#[test]
fn shutdown_flag_stops_before_next_cycle() {
    let mut hook = ScriptedHook::new(vec![vec![rec(1, BASE_WEIGHT, 10)]]);
    hook.exit_when_done = false;
    let shutdown = Arc::new(AtomicBool::new(true));
    let mut ctl = make_loop(hook, 8).with_shutdown(Arc::clone(&shutdown));

    assert_eq!(ctl.run().unwrap(), LoopExit::Requested);
    assert!(ctl.interface().all_dispatched().is_empty());
    assert_eq!(ctl.scheduler().stats().nr_cycles(), 0);
}

#[test]
fn shutdown_method_sets_shared_flag() {
    let hook = ScriptedHook::new(vec![]);
    let ctl = make_loop(hook, 8);
    let flag = ctl.shutdown_signal();
    assert!(!flag.load(Ordering::Relaxed));
    ctl.shutdown();
    assert!(flag.load(Ordering::Relaxed));
}

#[test]
fn closed_dispatch_channel_ends_loop_with_error() {
    let mut hook = ScriptedHook::new(vec![
        vec![rec(1, BASE_WEIGHT, 10), rec(2, BASE_WEIGHT, 20), rec(3, BASE_WEIGHT, 30)],
    ]);
    hook.close_after = Some(1);
    let mut ctl = make_loop(hook, 8);

    let err = ctl.run().unwrap_err();
    assert!(matches!(err, SchedError::InterfaceClosed(2)));
    assert_eq!(ctl.interface().all_dispatched(), vec![1]);
}

#[test]
fn hook_exiting_mid_dispatch_is_not_an_error() {
    let mut hook = ScriptedHook::new(vec![
        vec![rec(1, BASE_WEIGHT, 10), rec(2, BASE_WEIGHT, 20)],
    ]);
    hook.close_after = Some(1);
    hook.exit_on_close = true;
    let mut ctl = make_loop(hook, 8);

    let exit = ctl.run().unwrap();
    assert_eq!(
        exit,
        LoopExit::HookExited(ExitInfo::new(ExitKind::Unregistered, "detached"))
    );
    assert_eq!(ctl.scheduler().stats().nr_dispatch_failures(), 1);
}

#[test]
fn out_of_range_records_do_not_stop_the_loop() {
    let hook = ScriptedHook::new(vec![
        vec![rec(500, BASE_WEIGHT, 10), rec(4, BASE_WEIGHT, 10)],
        vec![rec(-1, BASE_WEIGHT, 10), rec(5, BASE_WEIGHT, 20)],
    ]);
    let mut ctl = make_loop(hook, 8);

    ctl.run().unwrap();
    let (sched, hook) = ctl.into_parts();
    assert_eq!(hook.all_dispatched(), vec![4, 5]);
    assert_eq!(sched.stats().nr_rejected(), 2);
}

#[test]
fn empty_script_exits_without_dispatching() {
    let hook = ScriptedHook::new(vec![]);
    let mut ctl = make_loop(hook, 8);
    let exit = ctl.run().unwrap();
    assert!(matches!(exit, LoopExit::HookExited(_)));
    assert!(ctl.interface().all_dispatched().is_empty());
    assert_eq!(ctl.interface().yields, 1);
}
