// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test class detection.
//!
//! A [`Detector`] decides whether one candidate class is a runnable test.
//! Detectors are pure: they never fail, never panic on bad input, and keep no
//! state between calls. Problems are reported through [`Diagnostics`] and the
//! candidate is treated as not a test.

mod annotation;
mod index;
mod pattern;

use crossbeam_channel::{Receiver, Sender};
use rayon::prelude::*;
use serde::Serialize;

use crate::candidate::CandidateClass;

pub use annotation::AnnotationDetector;
pub use index::ClassIndex;
pub use pattern::NamePatternDetector;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Below this many candidates, sequential classification is faster than
/// rayon's scheduling overhead.
const PARALLEL_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Test,
    NotTest,
}

/// A problem found while classifying a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

/// Side channel for detection problems.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    tx: Sender<Diagnostic>,
}

impl Diagnostics {
    pub fn channel() -> (Self, Receiver<Diagnostic>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn report(&self, candidate: &CandidateClass, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            path: candidate.relative_path(),
            message: message.into(),
        };
        tracing::warn!("skipping {}: {}", diagnostic.path, diagnostic.message);
        // Receiver gone means nobody is collecting; the warning above suffices.
        let _ = self.tx.send(diagnostic);
    }
}

/// Read-only inputs shared by all classifications in one run.
pub struct DetectionContext<'a> {
    pub index: &'a ClassIndex,
    pub diagnostics: &'a Diagnostics,
}

/// Classifies a candidate class as a test or not.
pub trait Detector: Send + Sync {
    fn classify(&self, candidate: &CandidateClass, ctx: &DetectionContext<'_>) -> Decision;
}

/// Outcome of classifying a candidate set against several detectors.
#[derive(Debug, Default)]
pub struct Classification {
    /// Accepted class names per detector, in candidate order.
    pub accepted: Vec<Vec<String>>,
    /// Candidates no detector accepted.
    pub rejected: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    pub fn accepted_count(&self) -> usize {
        self.accepted.iter().map(Vec::len).sum()
    }
}

/// Classify every candidate. The first detector that accepts a class claims it.
///
/// Uses parallel processing for large candidate sets (>= PARALLEL_THRESHOLD).
pub fn classify_all(candidates: &[CandidateClass], detectors: &[&dyn Detector]) -> Classification {
    let index = ClassIndex::build(candidates);
    let (diagnostics, diagnostics_rx) = Diagnostics::channel();
    let ctx = DetectionContext { index: &index, diagnostics: &diagnostics };

    let claim = |candidate: &CandidateClass| {
        detectors
            .iter()
            .position(|d| d.classify(candidate, &ctx) == Decision::Test)
    };

    let claims: Vec<Option<usize>> = if candidates.len() >= PARALLEL_THRESHOLD {
        candidates.par_iter().map(claim).collect()
    } else {
        candidates.iter().map(claim).collect()
    };

    let mut classification = Classification {
        accepted: vec![Vec::new(); detectors.len()],
        ..Classification::default()
    };
    for (candidate, claim) in candidates.iter().zip(claims) {
        match claim {
            Some(i) => classification.accepted[i].push(candidate.class_name()),
            None => classification.rejected += 1,
        }
    }

    drop(diagnostics);
    classification.diagnostics = diagnostics_rx.try_iter().collect();
    classification
        .diagnostics
        .sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
    // Several detectors may report the same unreadable file.
    classification.diagnostics.dedup();
    classification
}
