// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specs for configuration errors.

use crate::prelude::*;

/// > A run without testmux.toml is a configuration error
#[test]
fn missing_config_exits_3() {
    let project = Project::empty();
    project
        .run()
        .assert()
        .code(3)
        .stderr(predicates::str::contains("no testmux.toml found"));
}

/// > Unknown keys are rejected
#[test]
fn unknown_key_exits_3() {
    let project = Project::empty();
    project.config("version = 1\nparallel = 4\n");
    project
        .run()
        .assert()
        .code(3)
        .stderr(predicates::str::contains("failed to parse"));
}

/// > A config must name at least one framework
#[test]
fn no_frameworks_exits_3() {
    let project = Project::empty();
    project.config("version = 1\n[run]\nclasses = [\"classes\"]\n");
    project
        .run()
        .assert()
        .code(3)
        .stderr(predicates::str::contains("no test frameworks configured"));
}

/// > Options of another framework are rejected
#[test]
fn foreign_option_exits_3() {
    let project = Project::empty();
    project.config(
        r#"
[run]
classes = ["classes"]

[[framework]]
kind = "testng"
options = { include_tags = ["fast"] }
"#,
    );
    project
        .run()
        .assert()
        .code(3)
        .stderr(predicates::str::contains("include_tags"));
}

/// > An explicit --config path is used instead of discovery
#[test]
fn explicit_config_path_is_used() {
    let project = Project::with_launcher("exit 0");
    project.class("com.acme.FooTest");
    let elsewhere = Project::empty();

    testmux_cmd()
        .args(["run", "--config"])
        .arg(project.path().join("testmux.toml"))
        .current_dir(elsewhere.path())
        .assert()
        .success();
}

/// > An invalid --timeout is a configuration error
#[test]
fn invalid_timeout_exits_3() {
    let project = Project::with_launcher("exit 0");
    project
        .run()
        .args(["--timeout", "soon"])
        .assert()
        .code(3)
        .stderr(predicates::str::contains("--timeout"));
}
