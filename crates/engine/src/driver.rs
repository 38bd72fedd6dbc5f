// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The driver loop.
//!
//! Sequential mode works one ready issue at a time; concurrent mode keeps a
//! table of worker threads. Both share the planning logic: when the queue
//! drains the planner runs, and repeated no-progress rounds stall the walk.

use crate::error::DriverError;
use crate::pidfile::PidFile;
use crate::planning::{finalize_walk, run_planning_round, PlanningOutcome, PlanningRound};
use crate::runner::AgentRunner;
use crate::signals::SignalFlags;
use crate::threshold::PlanningThreshold;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use wk_core::{Clock, Slug, SystemClock, WalkConfig, WalkStatus};
use wk_store::{paths, WalkStore};

/// How long a shutting-down concurrent driver waits for workers to finish.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// How the driver loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Normal termination; the walk header records the terminal state.
    Finished,
    /// A restart marker was consumed; the caller should exit with code 42.
    Restart,
}

/// Driver construction options.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Stop after this many loop iterations (testing and bounded runs).
    pub max_iterations: Option<u64>,
    /// Override the configured inter-iteration sleep.
    pub sleep: Option<Duration>,
    /// Override the concurrent-mode drain timeout.
    pub drain_timeout: Option<Duration>,
    /// Externally supplied signal flags; fresh detached flags otherwise.
    pub signals: Option<SignalFlags>,
}

/// The investigation driver.
pub struct Driver<C: Clock = SystemClock> {
    store: WalkStore<C>,
    config: WalkConfig,
    runner: AgentRunner<C>,
    signals: SignalFlags,
    threshold: PlanningThreshold,
    last_planning: DateTime<Utc>,
    backend: Arc<Mutex<()>>,
    sleep: Duration,
    drain_timeout: Duration,
    max_iterations: Option<u64>,
}

type WorkerHandle = JoinHandle<Result<crate::runner::RunOutcome, crate::error::RunnerError>>;

impl<C: Clock + 'static> Driver<C> {
    pub fn new(store: WalkStore<C>, options: DriverOptions) -> Result<Self, DriverError> {
        let (header, _) = store.load_walk()?;
        let config = header.config;
        let backend = Arc::new(Mutex::new(()));
        let runner = AgentRunner::new(store.clone(), config.clone(), Arc::clone(&backend));
        let last_planning = store.now();

        Ok(Self {
            threshold: PlanningThreshold::new(config.planning_threshold),
            sleep: options
                .sleep
                .unwrap_or_else(|| Duration::from_secs(config.sleep_secs)),
            drain_timeout: options.drain_timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT),
            signals: options.signals.unwrap_or_else(SignalFlags::detached),
            max_iterations: options.max_iterations,
            store,
            config,
            runner,
            last_planning,
            backend,
        })
    }

    pub fn signals(&self) -> &SignalFlags {
        &self.signals
    }

    /// Run the loop to a terminal outcome.
    ///
    /// Refuses to start when another driver holds the PID file. The PID
    /// file is removed on return (clean exit).
    pub fn run(&mut self) -> Result<DriverExit, DriverError> {
        let _pid = PidFile::acquire(&self.store.root().join(paths::PID_FILE))?;
        self.store.reopen_if_stalled()?;

        tracing::info!(
            root = %self.store.root().display(),
            max_concurrent = self.config.max_concurrent,
            "driver starting"
        );

        if self.config.max_concurrent > 1 {
            self.run_concurrent(self.config.max_concurrent as usize)
        } else {
            self.run_sequential()
        }
    }

    fn run_sequential(&mut self) -> Result<DriverExit, DriverError> {
        let mut consecutive_planning = 0u32;
        let mut iterations = 0u64;

        loop {
            if self.budget_spent(&mut iterations) {
                return Ok(DriverExit::Finished);
            }
            if self.take_restart_marker()? {
                return Ok(DriverExit::Restart);
            }
            if self.signals.take_sighup() {
                tracing::info!("SIGHUP received; ignoring");
            }
            if self.signals.shutdown_requested() {
                finalize_walk(&self.store, WalkStatus::Stopped, "stopped by signal")?;
                return Ok(DriverExit::Finished);
            }

            // Pre-emptive planning on accumulated signals
            if !self.store.ready_issues()?.is_empty() && self.should_plan_now() {
                tracing::info!("pre-emptive planning triggered");
                let round = self.planning_round()?;
                if let PlanningOutcome::Completed { reason } = round.outcome {
                    finalize_walk(&self.store, WalkStatus::Completed, &reason)?;
                    return Ok(DriverExit::Finished);
                }
            }

            let ready = self.store.ready_issues()?;
            if ready.is_empty() {
                if self.parent_walk_closed() {
                    finalize_walk(&self.store, WalkStatus::Stopped, "parent walk closed")?;
                    return Ok(DriverExit::Finished);
                }
                consecutive_planning += 1;
                if consecutive_planning > self.config.max_planning_rounds {
                    finalize_walk(
                        &self.store,
                        WalkStatus::Stalled,
                        &format!(
                            "no progress after {} planning rounds",
                            self.config.max_planning_rounds
                        ),
                    )?;
                    return Ok(DriverExit::Finished);
                }
                let round = self.planning_round()?;
                match round.outcome {
                    PlanningOutcome::Completed { reason } => {
                        finalize_walk(&self.store, WalkStatus::Completed, &reason)?;
                        return Ok(DriverExit::Finished);
                    }
                    PlanningOutcome::CreatedIssues => consecutive_planning = 0,
                    PlanningOutcome::NoWorkFound => {}
                }
                self.pause();
                continue;
            }

            consecutive_planning = 0;
            let slug = ready[0].slug.clone();
            if let Err(e) = self.runner.run_issue(&slug) {
                tracing::error!(slug = %slug, error = %e, "worker invocation failed");
            }
            self.pause();
        }
    }

    fn run_concurrent(&mut self, slots: usize) -> Result<DriverExit, DriverError> {
        let mut active: HashMap<Slug, WorkerHandle> = HashMap::new();
        let mut consecutive_planning = 0u32;
        let mut iterations = 0u64;

        loop {
            if self.budget_spent(&mut iterations) {
                self.drain(&mut active);
                return Ok(DriverExit::Finished);
            }
            if self.take_restart_marker()? {
                self.drain(&mut active);
                return Ok(DriverExit::Restart);
            }
            if self.signals.take_sighup() {
                tracing::info!("SIGHUP received; ignoring");
            }

            reap(&mut active);

            if self.signals.shutdown_requested() {
                self.drain(&mut active);
                finalize_walk(&self.store, WalkStatus::Stopped, "stopped by signal")?;
                return Ok(DriverExit::Finished);
            }

            // Planning is serialised with worker execution: only plan when
            // the worker table is empty.
            if active.is_empty() {
                if !self.store.ready_issues()?.is_empty() && self.should_plan_now() {
                    tracing::info!("pre-emptive planning triggered");
                    let round = self.planning_round()?;
                    if let PlanningOutcome::Completed { reason } = round.outcome {
                        finalize_walk(&self.store, WalkStatus::Completed, &reason)?;
                        return Ok(DriverExit::Finished);
                    }
                }

                if self.store.ready_issues()?.is_empty() {
                    if self.parent_walk_closed() {
                        finalize_walk(&self.store, WalkStatus::Stopped, "parent walk closed")?;
                        return Ok(DriverExit::Finished);
                    }
                    consecutive_planning += 1;
                    if consecutive_planning > self.config.max_planning_rounds {
                        finalize_walk(
                            &self.store,
                            WalkStatus::Stalled,
                            &format!(
                                "no progress after {} planning rounds",
                                self.config.max_planning_rounds
                            ),
                        )?;
                        return Ok(DriverExit::Finished);
                    }
                    let round = self.planning_round()?;
                    match round.outcome {
                        PlanningOutcome::Completed { reason } => {
                            finalize_walk(&self.store, WalkStatus::Completed, &reason)?;
                            return Ok(DriverExit::Finished);
                        }
                        PlanningOutcome::CreatedIssues => consecutive_planning = 0,
                        PlanningOutcome::NoWorkFound => {}
                    }
                    self.pause();
                    continue;
                }
            }

            // Fill free slots from the ready queue, skipping already-active
            // issues.
            let free = slots.saturating_sub(active.len());
            if free > 0 {
                let ready = self.store.ready_issues()?;
                let mut spawned = 0usize;
                for issue in ready {
                    if spawned >= free {
                        break;
                    }
                    if active.contains_key(&issue.slug) {
                        continue;
                    }
                    consecutive_planning = 0;
                    let runner = self.runner.clone();
                    let slug = issue.slug.clone();
                    let thread_slug = slug.clone();
                    tracing::debug!(slug = %slug, "spawning worker thread");
                    let handle =
                        std::thread::spawn(move || runner.run_issue(&thread_slug));
                    active.insert(slug, handle);
                    spawned += 1;
                }
            }

            self.pause();
        }
    }

    /// True once the iteration budget is exhausted.
    fn budget_spent(&self, iterations: &mut u64) -> bool {
        if let Some(max) = self.max_iterations {
            if *iterations >= max {
                tracing::info!(max, "iteration budget spent");
                return true;
            }
        }
        *iterations += 1;
        false
    }

    fn take_restart_marker(&self) -> Result<bool, DriverError> {
        let marker = self.store.root().join(paths::RESTART_MARKER);
        if !marker.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&marker)?;
        tracing::info!("restart requested");
        Ok(true)
    }

    fn should_plan_now(&self) -> bool {
        let context = self.store.new_context_since(self.last_planning);
        context.has_pivotal()
            || (context.bytes > self.threshold.bytes() && context.has_surprising())
    }

    fn planning_round(&mut self) -> Result<PlanningRound, DriverError> {
        let round = run_planning_round(&self.store, &self.config, &self.backend)?;
        self.threshold.adjust(round.new_issues);
        self.last_planning = self.store.now();
        Ok(round)
    }

    fn parent_walk_closed(&self) -> bool {
        let Some(parent) = &self.config.parent else {
            return false;
        };
        match WalkStore::open(parent).and_then(|store| store.load_walk()) {
            Ok((header, _)) => header.status != WalkStatus::Open,
            Err(e) => {
                tracing::warn!(parent = %parent.display(), error = %e, "cannot read parent walk");
                false
            }
        }
    }

    /// Wait for active workers, bounded by the drain timeout; abandon the
    /// rest.
    fn drain(&self, active: &mut HashMap<Slug, WorkerHandle>) {
        if active.is_empty() {
            return;
        }
        tracing::info!(workers = active.len(), "draining workers");
        let deadline = Instant::now() + self.drain_timeout;
        while !active.is_empty() && Instant::now() < deadline {
            reap(active);
            std::thread::sleep(Duration::from_millis(100));
        }
        if !active.is_empty() {
            tracing::warn!(
                workers = active.len(),
                "abandoning workers after drain timeout"
            );
            active.clear();
        }
    }

    fn pause(&self) {
        if !self.sleep.is_zero() {
            std::thread::sleep(self.sleep);
        }
    }
}

/// Join finished worker threads. The loop itself never aborts on a single
/// issue's failure: errors are logged and the retry policy governs the
/// issue's next eligibility through its recorded runs.
fn reap(active: &mut HashMap<Slug, WorkerHandle>) {
    let finished: Vec<Slug> = active
        .iter()
        .filter(|(_, handle)| handle.is_finished())
        .map(|(slug, _)| slug.clone())
        .collect();

    for slug in finished {
        let Some(handle) = active.remove(&slug) else {
            continue;
        };
        match handle.join() {
            Ok(Ok(outcome)) => {
                tracing::debug!(slug = %slug, ?outcome, "worker finished");
            }
            Ok(Err(e)) => {
                tracing::warn!(slug = %slug, error = %e, "worker invocation failed");
            }
            Err(_) => {
                tracing::error!(slug = %slug, "worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
