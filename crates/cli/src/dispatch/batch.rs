// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Partitioning accepted classes into batches.

use crate::protocol::BatchId;

/// How accepted classes are grouped onto workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchingStrategy {
    /// Up to `size` classes per batch; idle workers take further batches.
    Fixed { size: usize },
    /// One class per batch, each on a fresh worker.
    PerClass,
}

impl BatchingStrategy {
    /// Whether a worker may run more than one batch.
    pub fn allows_reuse(self) -> bool {
        matches!(self, BatchingStrategy::Fixed { .. })
    }

    /// Split `classes` into batch contents, preserving order.
    pub fn partition(self, classes: &[String]) -> Vec<Vec<String>> {
        let size = match self {
            BatchingStrategy::Fixed { size } => size.max(1),
            BatchingStrategy::PerClass => 1,
        };
        classes.chunks(size).map(<[String]>::to_vec).collect()
    }
}

/// Classes assigned together to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: BatchId,
    /// Index of the owning framework descriptor.
    pub framework: usize,
    pub classes: Vec<String>,
    /// 0 for the first dispatch, incremented per retry.
    pub attempt: u32,
    /// Retry batches never reuse a worker.
    pub fresh_worker: bool,
}

impl Batch {
    pub fn contains(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Hands out batch ids, unique within a run.
#[derive(Debug, Default)]
pub struct BatchIds(BatchId);

impl BatchIds {
    pub fn next(&mut self) -> BatchId {
        self.0 += 1;
        self.0
    }
}

/// Initial batches for every framework, in framework then class order.
pub fn plan(strategy: BatchingStrategy, accepted: &[Vec<String>], ids: &mut BatchIds) -> Vec<Batch> {
    accepted
        .iter()
        .enumerate()
        .flat_map(|(framework, classes)| {
            strategy
                .partition(classes)
                .into_iter()
                .map(move |classes| (framework, classes))
        })
        .map(|(framework, classes)| Batch {
            id: ids.next(),
            framework,
            classes,
            attempt: 0,
            fresh_worker: false,
        })
        .collect()
}
