// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! State and event loop of one dispatch run.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select};

use super::batch::{Batch, BatchIds, plan};
use super::handle::{Assignment, WorkerHandle, WorkerState};
use super::result::ClassOutcome;
use super::{DispatchSettings, Dispatcher};
use crate::launch::ConfiguratorChain;
use crate::protocol::{ClassStatus, Directive, WorkerEvent};
use crate::worker::{MessageBody, WorkerId, WorkerMessage};

/// Output lines kept per class.
const OUTPUT_TAIL_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopCause {
    Cancelled,
    FailFast,
}

impl StopCause {
    fn skip_reason(self) -> &'static str {
        match self {
            StopCause::Cancelled => "not run: run cancelled",
            StopCause::FailFast => "not run: stopped after first failure",
        }
    }
}

pub(super) struct Run<'d, 'a> {
    dispatcher: &'d Dispatcher<'a>,
    queue: VecDeque<Batch>,
    ids: BatchIds,
    workers: BTreeMap<WorkerId, WorkerHandle>,
    next_worker: WorkerId,
    expected: Vec<(String, usize)>,
    outcomes: BTreeMap<String, ClassOutcome>,
    output: HashMap<String, VecDeque<String>>,
    events_tx: Sender<WorkerMessage>,
    events_rx: Receiver<WorkerMessage>,
    stopping: Option<StopCause>,
    infrastructure_failure: bool,
}

impl<'d, 'a> Run<'d, 'a> {
    pub(super) fn new(dispatcher: &'d Dispatcher<'a>) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            dispatcher,
            queue: VecDeque::new(),
            ids: BatchIds::default(),
            workers: BTreeMap::new(),
            next_worker: 0,
            expected: Vec::new(),
            outcomes: BTreeMap::new(),
            output: HashMap::new(),
            events_tx,
            events_rx,
            stopping: None,
            infrastructure_failure: false,
        }
    }

    fn settings(&self) -> &DispatchSettings {
        &self.dispatcher.settings
    }

    /// Run every accepted class to a terminal status.
    pub(super) fn execute(&mut self, accepted: &[Vec<String>]) {
        self.expected = accepted
            .iter()
            .enumerate()
            .flat_map(|(framework, classes)| classes.iter().map(move |c| (c.clone(), framework)))
            .collect();
        self.queue = plan(self.settings().strategy, accepted, &mut self.ids).into();
        tracing::debug!(
            "dispatching {} classes in {} batches",
            self.expected.len(),
            self.queue.len()
        );

        let events = self.events_rx.clone();
        let mut cancel = self.dispatcher.cancel.receiver();
        let mut run_timer = match self.dispatcher.run_timeout {
            Some(timeout) => crossbeam_channel::after(timeout),
            None => crossbeam_channel::never(),
        };
        loop {
            self.schedule();
            if self.queue.is_empty() && self.workers.is_empty() {
                break;
            }

            let timer = match self.next_deadline() {
                Some(at) => crossbeam_channel::at(at),
                None => crossbeam_channel::never(),
            };
            let mut cancel_done = false;
            let mut timer_done = false;
            select! {
                recv(events) -> message => {
                    if let Ok(message) = message {
                        self.on_message(message);
                    }
                }
                recv(cancel) -> signal => {
                    if signal.is_ok() {
                        self.stop(StopCause::Cancelled);
                    }
                    cancel_done = true;
                }
                recv(run_timer) -> _ => {
                    tracing::warn!("run timeout elapsed; cancelling");
                    self.stop(StopCause::Cancelled);
                    timer_done = true;
                }
                recv(timer) -> _ => {}
            }
            if cancel_done {
                // Fired or disconnected; either way there is nothing more to hear.
                cancel = crossbeam_channel::never();
            }
            if timer_done {
                run_timer = crossbeam_channel::never();
            }
            self.expire_deadlines(Instant::now());
        }
    }

    /// Outcomes, whether the run was cancelled, and whether infrastructure failed.
    pub(super) fn finish(mut self) -> (BTreeMap<String, ClassOutcome>, bool, bool) {
        let expected = std::mem::take(&mut self.expected);
        for (class, framework) in expected {
            if !self.outcomes.contains_key(&class) {
                tracing::warn!("no result recorded for {}", class);
                self.record(
                    class,
                    framework,
                    ClassStatus::Crashed,
                    vec!["no result recorded".to_string()],
                    0,
                );
            }
        }
        (
            self.outcomes,
            self.stopping == Some(StopCause::Cancelled),
            self.infrastructure_failure,
        )
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    fn schedule(&mut self) {
        if let Some(cause) = self.stopping {
            self.skip_queued(cause);
        }

        while let Some(batch) = self.queue.pop_front() {
            if let Some(id) = self.reusable_worker(&batch) {
                self.assign(id, batch);
                continue;
            }
            if self.workers.len() < self.settings().max_parallel {
                self.spawn(batch);
                continue;
            }
            self.queue.push_front(batch);
            // At capacity: an idle worker that cannot take the next batch
            // makes room for one that can.
            let idle = self.workers.values().find(|w| w.is_idle()).map(|w| w.id);
            if let Some(id) = idle {
                self.retire(id);
            }
            break;
        }

        if self.queue.is_empty() {
            let idle: Vec<WorkerId> = self
                .workers
                .values()
                .filter(|w| w.is_idle())
                .map(|w| w.id)
                .collect();
            for id in idle {
                self.retire(id);
            }
        }
    }

    fn reusable_worker(&self, batch: &Batch) -> Option<WorkerId> {
        let settings = self.settings();
        if !settings.strategy.allows_reuse() || batch.fresh_worker {
            return None;
        }
        self.workers
            .values()
            .find(|w| {
                w.is_idle()
                    && w.framework == batch.framework
                    && settings.fork_every.is_none_or(|n| w.batches_run < n)
            })
            .map(|w| w.id)
    }

    fn assign(&mut self, id: WorkerId, batch: Batch) {
        let deadline = self.batch_deadline();
        let Some(handle) = self.workers.get_mut(&id) else {
            self.queue.push_front(batch);
            return;
        };
        tracing::debug!(worker = id, batch = batch.id, "reusing worker");
        handle.assign(batch);
        handle.deadline = deadline;
        if let Err(e) = handle.start_batch() {
            self.crash(id, format!("failed to send batch: {}", e));
        }
    }

    fn spawn(&mut self, batch: Batch) {
        let dispatcher = self.dispatcher;
        let descriptor = &dispatcher.descriptors[batch.framework];
        let chain = ConfiguratorChain::new()
            .then(dispatcher.base.clone())
            .then(descriptor.configurator());
        let attempts = self.settings().launch_attempts.max(1);
        let launch_timeout = self.settings().launch_timeout;

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            let id = self.next_worker;
            self.next_worker += 1;
            // Each attempt gets a freshly configured spec.
            let spec = chain.build();
            let mut connection = match dispatcher.launcher.launch(&spec, id, self.events_tx.clone()) {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!(worker = id, attempt, "launch failed: {}", e);
                    last_error = e.to_string();
                    continue;
                }
            };
            if let Err(e) = connection.send(&Directive::Init(descriptor.factory().clone())) {
                tracing::warn!(worker = id, attempt, "failed to initialize worker: {}", e);
                last_error = e.to_string();
                connection.kill();
                connection.reap();
                continue;
            }

            tracing::debug!(
                worker = id,
                batch = batch.id,
                framework = descriptor.name(),
                "started worker"
            );
            let mut handle = WorkerHandle::new(id, batch.framework, connection, batch);
            handle.deadline = Some(Instant::now() + launch_timeout);
            self.workers.insert(id, handle);
            return;
        }

        tracing::error!(
            batch = batch.id,
            "giving up on batch after {} launch attempts: {}",
            attempts,
            last_error
        );
        self.infrastructure_failure = true;
        let message = format!("could not launch worker: {}", last_error);
        for class in batch.classes {
            self.record(
                class,
                batch.framework,
                ClassStatus::Crashed,
                vec![message.clone()],
                batch.attempt + 1,
            );
        }
    }

    /// Ask a worker to finish up and exit.
    fn retire(&mut self, id: WorkerId) {
        let grace = self.settings().grace_period;
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };
        match handle.state() {
            WorkerState::Running => {
                handle.request_stop();
                handle.transition(WorkerState::Draining);
                handle.deadline = Some(Instant::now() + grace);
            }
            WorkerState::Starting => self.crash(id, "stopped before the worker was ready".to_string()),
            WorkerState::Draining | WorkerState::Terminated | WorkerState::Crashed => {}
        }
    }

    /// Stop dispatching: queued batches are skipped and workers are stopped.
    fn stop(&mut self, cause: StopCause) {
        if self.stopping.is_some() {
            return;
        }
        tracing::info!("stopping run: {:?}", cause);
        self.stopping = Some(cause);
        self.skip_queued(cause);
        let ids: Vec<WorkerId> = self.workers.keys().copied().collect();
        for id in ids {
            self.retire(id);
        }
    }

    fn skip_queued(&mut self, cause: StopCause) {
        while let Some(batch) = self.queue.pop_front() {
            for class in batch.classes {
                self.record(
                    class,
                    batch.framework,
                    ClassStatus::Skipped,
                    vec![cause.skip_reason().to_string()],
                    batch.attempt,
                );
            }
        }
    }

    // =========================================================================
    // Worker events
    // =========================================================================

    fn on_message(&mut self, message: WorkerMessage) {
        if !self.workers.contains_key(&message.worker) {
            tracing::trace!(worker = message.worker, "ignoring message from retired worker");
            return;
        }
        match message.body {
            MessageBody::Event(event) => self.on_event(message.worker, event),
            MessageBody::Closed { error } => self.on_closed(message.worker, error),
        }
    }

    fn on_event(&mut self, id: WorkerId, event: WorkerEvent) {
        let deadline = self.batch_deadline();
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };
        match event {
            WorkerEvent::Ready => {
                if !handle.transition(WorkerState::Running) {
                    return;
                }
                handle.deadline = handle.assignment.as_ref().and(deadline);
                if let Err(e) = handle.start_batch() {
                    self.crash(id, format!("failed to send batch: {}", e));
                }
            }
            WorkerEvent::ClassStart { class } => {
                let running = handle.state() == WorkerState::Running;
                match handle.assignment.as_mut() {
                    Some(assignment) if assignment.batch.contains(&class) => {
                        tracing::debug!(worker = id, class = %class, "class started");
                        assignment.started.insert(class);
                        if running {
                            handle.deadline = deadline;
                        }
                    }
                    _ => tracing::warn!(worker = id, "ignoring start of unassigned class {}", class),
                }
            }
            WorkerEvent::Output { class, stream, line } => {
                tracing::trace!(worker = id, class = %class, ?stream, "{}", line);
                let tail = self.output.entry(class).or_default();
                if tail.len() == OUTPUT_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            WorkerEvent::ClassResult {
                class,
                status,
                duration_ms,
                failures,
            } => self.on_result(id, class, status, duration_ms, failures),
            WorkerEvent::BatchEnd { batch_id } => self.on_batch_end(id, batch_id),
            WorkerEvent::WorkerError { message } => {
                tracing::warn!(worker = id, "worker error: {}", message);
                handle.last_error = Some(message);
            }
        }
    }

    fn on_result(
        &mut self,
        id: WorkerId,
        class: String,
        status: ClassStatus,
        duration_ms: u64,
        failures: Vec<String>,
    ) {
        let deadline = self.batch_deadline();
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };
        let running = handle.state() == WorkerState::Running;
        let Some(assignment) = handle.assignment.as_mut() else {
            tracing::warn!(worker = id, "ignoring result for {} outside a batch", class);
            return;
        };
        if !assignment.batch.contains(&class) || !assignment.resolved.insert(class.clone()) {
            tracing::warn!(worker = id, "ignoring unexpected result for {}", class);
            return;
        }
        let framework = assignment.batch.framework;
        let attempts = assignment.batch.attempt + 1;
        if running {
            handle.deadline = deadline;
        }

        tracing::debug!(worker = id, class = %class, status = status.as_str(), "class finished");
        if let Some(outcome) = self.record(class, framework, status, failures, attempts) {
            outcome.duration_ms = duration_ms;
        }
        if status.is_failure() && self.settings().fail_fast {
            self.stop(StopCause::FailFast);
        }
    }

    fn on_batch_end(&mut self, id: WorkerId, batch_id: u64) {
        let settings = self.settings();
        let reuse = settings.strategy.allows_reuse();
        let fork_every = settings.fork_every;
        let stopping = self.stopping.is_some();

        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };
        let Some(assignment) = handle.assignment.take_if(|a| a.batch.id == batch_id) else {
            tracing::warn!(worker = id, batch = batch_id, "ignoring end of unknown batch");
            return;
        };
        if handle.state() == WorkerState::Running {
            handle.deadline = None;
        }
        handle.batches_run += 1;
        tracing::debug!(worker = id, batch = batch_id, "batch finished");

        let recycle = !reuse || stopping || fork_every.is_some_and(|n| handle.batches_run >= n);
        if recycle {
            self.retire(id);
        }

        let unresolved = assignment.unresolved();
        if !unresolved.is_empty() {
            self.resolve_unfinished(&assignment, unresolved, "batch ended without a result");
        }
    }

    fn on_closed(&mut self, id: WorkerId, error: Option<String>) {
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };
        if handle.state() == WorkerState::Draining && handle.assignment.is_none() && error.is_none() {
            handle.transition(WorkerState::Terminated);
            handle.reap();
            self.workers.remove(&id);
            return;
        }
        let reason = handle
            .last_error
            .take()
            .or(error)
            .unwrap_or_else(|| "worker exited unexpectedly".to_string());
        self.crash(id, reason);
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    fn crash(&mut self, id: WorkerId, reason: String) {
        let Some(mut handle) = self.workers.remove(&id) else {
            return;
        };
        handle.transition(WorkerState::Crashed);
        handle.kill();

        let Some(assignment) = handle.assignment.take() else {
            tracing::debug!(worker = id, "idle worker crashed: {}", reason);
            return;
        };
        tracing::warn!(worker = id, batch = assignment.batch.id, "worker crashed: {}", reason);
        let unresolved = assignment.unresolved();
        if !unresolved.is_empty() {
            self.resolve_unfinished(&assignment, unresolved, &reason);
        }
    }

    /// Settle classes a worker left without a result: retry them on a fresh
    /// worker while the budget lasts, otherwise record them.
    fn resolve_unfinished(&mut self, assignment: &Assignment, unresolved: Vec<String>, reason: &str) {
        let batch = &assignment.batch;

        if let Some(cause) = self.stopping {
            for class in unresolved {
                let (status, message) = if assignment.started.contains(&class) {
                    (ClassStatus::Crashed, format!("interrupted: {}", reason))
                } else {
                    (ClassStatus::Skipped, cause.skip_reason().to_string())
                };
                self.record(class, batch.framework, status, vec![message], batch.attempt + 1);
            }
            return;
        }

        if batch.attempt < self.settings().retries {
            let retry = Batch {
                id: self.ids.next(),
                framework: batch.framework,
                classes: unresolved,
                attempt: batch.attempt + 1,
                fresh_worker: true,
            };
            tracing::info!(
                "retrying {} classes of batch {} as batch {} (attempt {})",
                retry.classes.len(),
                batch.id,
                retry.id,
                retry.attempt + 1
            );
            self.queue.push_back(retry);
            return;
        }

        self.infrastructure_failure = true;
        for class in unresolved {
            self.record(
                class,
                batch.framework,
                ClassStatus::Crashed,
                vec![reason.to_string()],
                batch.attempt + 1,
            );
        }
    }

    fn expire_deadlines(&mut self, now: Instant) {
        let expired: Vec<(WorkerId, WorkerState)> = self
            .workers
            .values()
            .filter(|w| w.deadline.is_some_and(|d| d <= now))
            .map(|w| (w.id, w.state()))
            .collect();

        let settings = self.settings();
        let launch_timeout = settings.launch_timeout;
        let progress_timeout = settings.class_timeout.unwrap_or_default() + settings.grace_period;
        let grace = settings.grace_period;
        for (id, state) in expired {
            let reason = match state {
                WorkerState::Starting => {
                    format!("worker not ready within {}", format_duration(launch_timeout))
                }
                WorkerState::Running => {
                    format!("no progress within {}", format_duration(progress_timeout))
                }
                WorkerState::Draining => {
                    format!("worker did not exit within {}", format_duration(grace))
                }
                WorkerState::Terminated | WorkerState::Crashed => continue,
            };
            self.crash(id, reason);
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn batch_deadline(&self) -> Option<Instant> {
        let settings = self.settings();
        settings
            .class_timeout
            .map(|timeout| Instant::now() + timeout + settings.grace_period)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.workers.values().filter_map(|w| w.deadline).min()
    }

    /// Record a final outcome. A class keeps its first outcome.
    fn record(
        &mut self,
        class: String,
        framework: usize,
        status: ClassStatus,
        failures: Vec<String>,
        attempts: u32,
    ) -> Option<&mut ClassOutcome> {
        if self.outcomes.contains_key(&class) {
            tracing::warn!("ignoring second outcome for {}", class);
            return None;
        }
        let output = self
            .output
            .remove(&class)
            .map(Vec::from)
            .unwrap_or_default();
        let outcome = ClassOutcome {
            framework: self.dispatcher.descriptors[framework].name().to_string(),
            status,
            duration_ms: 0,
            failures,
            attempts,
            output,
        };
        Some(self.outcomes.entry(class).or_insert(outcome))
    }
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}
