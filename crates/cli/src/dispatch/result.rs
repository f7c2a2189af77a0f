// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregated run results.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::detect::Diagnostic;
use crate::protocol::ClassStatus;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const TEST_FAILURE: i32 = 1;
    pub const INFRASTRUCTURE: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Failed,
    Aborted,
}

/// Final result of one test class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassOutcome {
    pub framework: String,
    pub status: ClassStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    /// Dispatch attempts, counting the first.
    pub attempts: u32,
    /// Last lines of captured output.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,
}

/// Per-status class counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub crashed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.crashed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub verdict: Verdict,
    /// A worker could not be launched or sustained after exhausting retries.
    pub infrastructure_failure: bool,
    pub classes: BTreeMap<String, ClassOutcome>,
    /// Candidates no framework accepted.
    pub rejected: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl RunResult {
    /// Decide the verdict for a finished set of outcomes.
    pub fn verdict_for(outcomes: &BTreeMap<String, ClassOutcome>, cancelled: bool) -> Verdict {
        if cancelled {
            Verdict::Aborted
        } else if outcomes.values().any(|o| o.status.is_failure()) {
            Verdict::Failed
        } else {
            Verdict::Success
        }
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for outcome in self.classes.values() {
            match outcome.status {
                ClassStatus::Passed => counts.passed += 1,
                ClassStatus::Failed => counts.failed += 1,
                ClassStatus::Skipped => counts.skipped += 1,
                ClassStatus::Crashed => counts.crashed += 1,
            }
        }
        counts
    }

    pub fn exit_code(&self) -> i32 {
        match self.verdict {
            Verdict::Aborted => exit_code::TEST_FAILURE,
            _ if self.infrastructure_failure => exit_code::INFRASTRUCTURE,
            Verdict::Failed => exit_code::TEST_FAILURE,
            Verdict::Success => exit_code::SUCCESS,
        }
    }
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}
