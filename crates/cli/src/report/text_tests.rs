#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;

use super::*;
use crate::detect::Diagnostic;
use crate::dispatch::ClassOutcome;

fn outcome(status: ClassStatus, duration_ms: u64, failures: &[&str], attempts: u32) -> ClassOutcome {
    ClassOutcome {
        framework: "unit".to_string(),
        status,
        duration_ms,
        failures: failures.iter().map(|s| s.to_string()).collect(),
        attempts,
        output: Vec::new(),
    }
}

fn result(classes: Vec<(&str, ClassOutcome)>, verdict: Verdict) -> RunResult {
    RunResult {
        started_at: Utc::now(),
        duration: Duration::from_millis(1500),
        verdict,
        infrastructure_failure: false,
        classes: classes
            .into_iter()
            .map(|(name, outcome)| (name.to_string(), outcome))
            .collect::<BTreeMap<_, _>>(),
        rejected: 0,
        diagnostics: Vec::new(),
    }
}

// =============================================================================
// Class lines
// =============================================================================

#[test]
fn one_line_per_class_in_name_order() {
    let result = result(
        vec![
            ("com.acme.YTest", outcome(ClassStatus::Passed, 12, &[], 1)),
            ("com.acme.XTest", outcome(ClassStatus::Passed, 0, &[], 1)),
        ],
        Verdict::Success,
    );
    let text = TextFormatter.format(&result).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "PASSED   com.acme.XTest (unit)");
    assert_eq!(lines[1], "PASSED   com.acme.YTest (unit, 12ms)");
}

#[test]
fn failures_are_indented_under_the_class() {
    let result = result(
        vec![(
            "com.acme.ZTest",
            outcome(ClassStatus::Failed, 2300, &["launcher exited with code 1", "expected:<1>"], 2),
        )],
        Verdict::Failed,
    );
    let text = TextFormatter.format(&result).unwrap();

    assert!(text.starts_with(
        "FAILED   com.acme.ZTest (unit, 2.3s, attempt 2)\n    launcher exited with code 1\n    expected:<1>\n"
    ));
}

#[test]
fn passed_class_hides_failure_lines() {
    let result = result(
        vec![("com.acme.XTest", outcome(ClassStatus::Passed, 0, &["noise"], 1))],
        Verdict::Success,
    );
    assert!(!TextFormatter.format(&result).unwrap().contains("noise"));
}

// =============================================================================
// Summary
// =============================================================================

#[test]
fn summary_counts_every_status() {
    let result = result(
        vec![
            ("a.A", outcome(ClassStatus::Passed, 0, &[], 1)),
            ("a.B", outcome(ClassStatus::Failed, 0, &[], 1)),
            ("a.C", outcome(ClassStatus::Skipped, 0, &["not run: run cancelled"], 1)),
            ("a.D", outcome(ClassStatus::Crashed, 0, &["worker exited unexpectedly"], 2)),
        ],
        Verdict::Aborted,
    );
    let text = TextFormatter.format(&result).unwrap();

    assert!(text.contains("\n4 classes: 1 passed, 1 failed, 1 skipped, 1 crashed (1.5s)\n"));
    assert!(text.ends_with("result: ABORTED\n"));
}

#[test]
fn empty_run_still_has_summary() {
    let result = result(Vec::new(), Verdict::Success);
    let text = TextFormatter.format(&result).unwrap();
    similar_asserts::assert_eq!(text, "0 classes: 0 passed, 0 failed, 0 skipped, 0 crashed (1.5s)\nresult: SUCCESS\n");
}

#[test]
fn infrastructure_failure_is_called_out() {
    let mut result = result(
        vec![("a.A", outcome(ClassStatus::Crashed, 0, &["could not launch worker: boom"], 1))],
        Verdict::Failed,
    );
    result.infrastructure_failure = true;
    let text = TextFormatter.format(&result).unwrap();
    assert!(text.contains("infrastructure failure"));
    assert!(text.ends_with("result: FAILED\n"));
}

#[test]
fn diagnostics_are_listed_as_warnings() {
    let mut result = result(Vec::new(), Verdict::Success);
    result.diagnostics.push(Diagnostic {
        path: "com/acme/BrokenTest.class".to_string(),
        message: "malformed class file: truncated".to_string(),
    });
    let text = TextFormatter.format(&result).unwrap();
    assert!(text.contains("warning: com/acme/BrokenTest.class: malformed class file: truncated\n"));
}

// =============================================================================
// Durations
// =============================================================================

#[yare::parameterized(
    millis = { 250, "250ms" },
    seconds = { 1500, "1.5s" },
    minutes = { 125_000, "2m05s" },
)]
fn human_durations(millis: u64, expected: &str) {
    assert_eq!(human_millis(millis), expected);
}
