//! Test helpers for behavioral specifications.
//!
//! Provides a small project builder for testing testmux CLI behavior.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub use assert_cmd::prelude::*;
pub use predicates;
pub use predicates::prelude::PredicateBooleanExt;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Returns a Command configured to run the testmux binary
pub fn testmux_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("testmux"));
    cmd.env_remove("TESTMUX_CONFIG").env_remove("TESTMUX_LOG");
    cmd
}

/// A temporary project directory.
pub struct Project {
    dir: TempDir,
}

impl Project {
    /// An empty project with no config.
    pub fn empty() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// A project whose single framework runs `script` for every class.
    ///
    /// Detection matches file names, so class files need no real bytecode.
    pub fn with_launcher(script: &str) -> Self {
        let project = Self::empty();
        project.config(&format!(
            r#"version = 1

[run]
classes = ["classes"]
max_parallel = 2
launch_timeout = "20s"

[[framework]]
kind = "junit"
name = "unit"
scan = false
command = ["sh", "-c", "{script}"]
"#
        ));
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `testmux.toml`.
    pub fn config(&self, content: &str) {
        self.file("testmux.toml", content);
    }

    /// Write a file, creating parent directories.
    pub fn file(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// Add a class file under `classes/` for a binary name.
    pub fn class(&self, name: &str) {
        self.file(&format!("classes/{}.class", name.replace('.', "/")), "");
    }

    /// `testmux run` in this project.
    pub fn run(&self) -> Command {
        let mut cmd = testmux_cmd();
        cmd.arg("run").current_dir(self.path());
        cmd
    }
}
