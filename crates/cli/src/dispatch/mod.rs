// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher: batching, worker lifecycle, timeouts, retries and result
//! aggregation.
//!
//! The dispatcher is the only component with cross-worker state. It runs on
//! the calling thread and waits on a single channel that every worker's event
//! reader feeds, so no worker's progress depends on another's. It never looks
//! at framework identity: everything framework-specific is reached through a
//! [`FrameworkDescriptor`].

mod batch;
mod cancel;
mod handle;
mod result;
mod run;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::candidate::CandidateClass;
use crate::detect::{Classification, Detector, classify_all};
use crate::framework::FrameworkDescriptor;
use crate::launch::{BaseConfigurator, WorkerConfigurator};
use crate::worker::WorkerLauncher;

pub use batch::{Batch, BatchIds, BatchingStrategy, plan};
pub use cancel::{CancelHandle, CancelToken, cancellation};
pub use handle::{Assignment, WorkerHandle, WorkerState};
pub use result::{ClassOutcome, RunResult, StatusCounts, Verdict, exit_code};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Validated dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub max_parallel: usize,
    pub strategy: BatchingStrategy,
    /// Batches a reused worker may run before it is replaced.
    pub fork_every: Option<usize>,
    /// Re-dispatches of a crashed or timed-out batch's unresolved classes.
    pub retries: u32,
    /// Spawn attempts per worker.
    pub launch_attempts: u32,
    /// Per-class limit; the dispatcher allows `grace_period` on top of it.
    pub class_timeout: Option<Duration>,
    /// Time from spawn to the worker's `Ready`.
    pub launch_timeout: Duration,
    /// Time a stopping worker gets before it is killed.
    pub grace_period: Duration,
    pub fail_fast: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            strategy: BatchingStrategy::Fixed { size: 16 },
            fork_every: None,
            retries: 1,
            launch_attempts: 2,
            class_timeout: None,
            launch_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(10),
            fail_fast: false,
        }
    }
}

pub struct Dispatcher<'a> {
    descriptors: &'a [FrameworkDescriptor],
    launcher: &'a dyn WorkerLauncher,
    settings: DispatchSettings,
    base: Arc<dyn WorkerConfigurator>,
    cancel: CancelToken,
    run_timeout: Option<Duration>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        descriptors: &'a [FrameworkDescriptor],
        launcher: &'a dyn WorkerLauncher,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            descriptors,
            launcher,
            settings,
            base: Arc::new(BaseConfigurator::default()),
            cancel: CancelToken::never(),
            run_timeout: None,
        }
    }

    /// Configurator applied before each framework's own.
    pub fn with_base_configurator(mut self, base: Arc<dyn WorkerConfigurator>) -> Self {
        self.base = base;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancel the run once `timeout` has passed since dispatch began.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Classify `candidates` with every descriptor's detector.
    pub fn classify(&self, candidates: &[CandidateClass]) -> Classification {
        let detectors: Vec<&dyn Detector> = self.descriptors.iter().map(|d| d.detector()).collect();
        let classification = classify_all(candidates, &detectors);
        tracing::debug!(
            "classified {} candidates: {} accepted, {} rejected",
            candidates.len(),
            classification.accepted_count(),
            classification.rejected
        );
        classification
    }

    /// Classify, dispatch and aggregate.
    pub fn run(&self, candidates: &[CandidateClass]) -> RunResult {
        let classification = self.classify(candidates);
        self.dispatch(classification)
    }

    /// Dispatch already-classified classes.
    pub fn dispatch(&self, classification: Classification) -> RunResult {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut run = run::Run::new(self);
        run.execute(&classification.accepted);
        let (classes, cancelled, infrastructure_failure) = run.finish();

        RunResult {
            started_at,
            duration: start.elapsed(),
            verdict: RunResult::verdict_for(&classes, cancelled),
            infrastructure_failure,
            classes,
            rejected: classification.rejected,
            diagnostics: classification.diagnostics,
        }
    }
}
