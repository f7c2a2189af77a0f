// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specs for `testmux run`.

use crate::prelude::*;

// =============================================================================
// Exit codes
// =============================================================================

/// > Exit code 0 when every class passes
#[test]
fn passing_run_exits_0() {
    let project = Project::with_launcher("exit 0");
    project.class("com.acme.FooTest");
    project.class("com.acme.BarTest");

    project
        .run()
        .assert()
        .success()
        .stdout(predicates::str::contains("PASSED   com.acme.BarTest"))
        .stdout(predicates::str::contains("PASSED   com.acme.FooTest"))
        .stdout(predicates::str::contains("result: SUCCESS"));
}

/// > Exit code 1 when a class fails
#[test]
fn failing_run_exits_1() {
    let project = Project::with_launcher("echo boom; exit 1");
    project.class("com.acme.FooTest");

    project
        .run()
        .assert()
        .code(1)
        .stdout(predicates::str::contains("FAILED   com.acme.FooTest"))
        .stdout(predicates::str::contains("launcher exited with code 1"))
        .stdout(predicates::str::contains("result: FAILED"));
}

/// > Classes that match no framework are not run
#[test]
fn unmatched_classes_are_not_reported() {
    let project = Project::with_launcher("exit 0");
    project.class("com.acme.FooTest");
    project.class("com.acme.Helper");

    project
        .run()
        .assert()
        .success()
        .stdout(predicates::str::contains("com.acme.Helper").not())
        .stdout(predicates::str::contains("1 classes: 1 passed"));
}

/// > --filter narrows the candidate classes
#[test]
fn filter_selects_classes() {
    let project = Project::with_launcher("exit 0");
    project.class("com.acme.FooTest");
    project.class("org.other.BarTest");

    project
        .run()
        .args(["--filter", "com.acme.*"])
        .assert()
        .success()
        .stdout(predicates::str::contains("com.acme.FooTest"))
        .stdout(predicates::str::contains("org.other.BarTest").not());
}

// =============================================================================
// JSON output
// =============================================================================

/// > JSON output carries the verdict, exit code and per-class outcomes
#[test]
fn json_output_reports_each_class() {
    let project = Project::with_launcher("exit 1");
    project.class("com.acme.FooTest");

    let output = project.run().args(["-o", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verdict"], "failed");
    assert_eq!(report["exit_code"], 1);
    assert_eq!(report["classes"]["com.acme.FooTest"]["status"], "failed");
    assert_eq!(report["classes"]["com.acme.FooTest"]["framework"], "unit");
}

/// > An empty class directory is a successful run
#[test]
fn no_classes_is_success() {
    let project = Project::with_launcher("exit 0");
    std::fs::create_dir_all(project.path().join("classes")).unwrap();

    project
        .run()
        .assert()
        .success()
        .stdout(predicates::str::contains("0 classes"));
}
