// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Name-pattern detector, used when bytecode scanning is turned off.

use globset::GlobSet;

use super::{Decision, DetectionContext, Detector};
use crate::candidate::CandidateClass;

/// Matches class file paths (`com/acme/FooTest.class`) against globs.
#[derive(Debug, Clone)]
pub struct NamePatternDetector {
    include: GlobSet,
    exclude: GlobSet,
}

impl NamePatternDetector {
    pub fn new(include: GlobSet, exclude: GlobSet) -> Self {
        Self { include, exclude }
    }
}

impl Detector for NamePatternDetector {
    fn classify(&self, candidate: &CandidateClass, ctx: &DetectionContext<'_>) -> Decision {
        if let Err(reason) = &candidate.content {
            ctx.diagnostics.report(candidate, format!("unreadable class file: {}", reason));
            return Decision::NotTest;
        }

        let path = candidate.relative_path();
        if self.include.is_match(&path) && !self.exclude.is_match(&path) {
            Decision::Test
        } else {
            Decision::NotTest
        }
    }
}
