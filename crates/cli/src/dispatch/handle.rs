// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher-side bookkeeping for one worker.

use std::collections::HashSet;
use std::time::Instant;

use super::batch::Batch;
use crate::protocol::{Directive, ProtocolError};
use crate::worker::{WorkerConnection, WorkerId};

/// Worker lifecycle.
///
/// `Starting → Running → Draining → Terminated`; any live state may move to
/// `Crashed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Draining,
    Terminated,
    Crashed,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Terminated | WorkerState::Crashed)
    }

    pub fn can_become(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Running, Draining)
                | (Draining, Terminated)
                | (Starting | Running | Draining, Crashed)
        )
    }
}

/// A batch held by a worker and how far it got.
#[derive(Debug)]
pub struct Assignment {
    pub batch: Batch,
    /// `BatchStart` has been written to the worker.
    pub sent: bool,
    pub started: HashSet<String>,
    pub resolved: HashSet<String>,
}

impl Assignment {
    fn new(batch: Batch) -> Self {
        Self {
            batch,
            sent: false,
            started: HashSet::new(),
            resolved: HashSet::new(),
        }
    }

    /// Classes with no result yet, in batch order.
    pub fn unresolved(&self) -> Vec<String> {
        self.batch
            .classes
            .iter()
            .filter(|c| !self.resolved.contains(*c))
            .cloned()
            .collect()
    }
}

pub struct WorkerHandle {
    pub id: WorkerId,
    pub framework: usize,
    state: WorkerState,
    connection: WorkerConnection,
    pub assignment: Option<Assignment>,
    pub deadline: Option<Instant>,
    pub batches_run: usize,
    /// Last `WorkerError` message, reported if the worker then dies.
    pub last_error: Option<String>,
}

impl WorkerHandle {
    pub fn new(id: WorkerId, framework: usize, connection: WorkerConnection, batch: Batch) -> Self {
        Self {
            id,
            framework,
            state: WorkerState::Starting,
            connection,
            assignment: Some(Assignment::new(batch)),
            deadline: None,
            batches_run: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Move to `next`. Invalid transitions are ignored and return false.
    pub fn transition(&mut self, next: WorkerState) -> bool {
        if !self.state.can_become(next) {
            tracing::debug!(worker = self.id, "ignoring transition {:?} -> {:?}", self.state, next);
            return false;
        }
        tracing::debug!(worker = self.id, "{:?} -> {:?}", self.state, next);
        self.state = next;
        true
    }

    /// Running with no batch.
    pub fn is_idle(&self) -> bool {
        self.state == WorkerState::Running && self.assignment.is_none()
    }

    pub fn assign(&mut self, batch: Batch) {
        self.assignment = Some(Assignment::new(batch));
    }

    /// Send the held batch's `BatchStart`.
    pub fn start_batch(&mut self) -> Result<(), ProtocolError> {
        let Some(assignment) = self.assignment.as_mut() else {
            return Ok(());
        };
        if assignment.sent {
            return Ok(());
        }
        let directive = Directive::BatchStart {
            batch_id: assignment.batch.id,
            classes: assignment.batch.classes.clone(),
        };
        assignment.sent = true;
        self.connection.send(&directive)
    }

    /// Ask the worker to finish and exit.
    pub fn request_stop(&mut self) {
        if let Err(e) = self.connection.send(&Directive::Stop) {
            tracing::debug!(worker = self.id, "could not send Stop: {}", e);
        }
        self.connection.close_input();
    }

    /// Forced termination.
    pub fn kill(&mut self) {
        self.connection.kill();
        self.connection.reap();
    }

    /// Release a worker that exited on its own.
    pub fn reap(&mut self) {
        self.connection.reap();
    }
}
