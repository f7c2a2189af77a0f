// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON format report output.


use serde::Serialize;
use termcolor::WriteColor;

use super::ReportFormatter;
use crate::dispatch::{RunResult, StatusCounts};

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;

/// JSON format report formatter.
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonReport<'a> {
    exit_code: i32,
    summary: StatusCounts,
    #[serde(flatten)]
    result: &'a RunResult,
}

impl ReportFormatter for JsonFormatter {
    fn write(&self, out: &mut dyn WriteColor, result: &RunResult) -> anyhow::Result<()> {
        let report = JsonReport {
            exit_code: result.exit_code(),
            summary: result.counts(),
            result,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        Ok(())
    }
}
