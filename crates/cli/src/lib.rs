// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! testmux: runs JVM test suites across several test frameworks in isolated
//! worker processes.
//!
//! Candidate class files are classified by each configured framework's
//! detector, partitioned into batches, and run by workers that rebuild a
//! framework processor from a serialized recipe. The dispatcher aggregates
//! the workers' event streams into a per-class [`dispatch::RunResult`].

pub mod candidate;
pub mod classfile;
pub mod cli;
pub mod color;
pub mod config;
pub mod detect;
pub mod discovery;
pub mod dispatch;
pub mod framework;
pub mod launch;
pub mod processor;
pub mod protocol;
pub mod report;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;
