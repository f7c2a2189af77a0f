// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text format report output.


use termcolor::{ColorSpec, WriteColor};

use super::{ReportFormatter, human_millis};
use crate::color::scheme;
use crate::dispatch::{RunResult, Verdict};
use crate::protocol::ClassStatus;

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;

/// Text format report formatter.
pub struct TextFormatter;

/// Width of the status column.
const STATUS_WIDTH: usize = 8;

fn status_spec(status: ClassStatus) -> ColorSpec {
    match status {
        ClassStatus::Passed => scheme::passed(),
        ClassStatus::Failed => scheme::failed(),
        ClassStatus::Skipped => scheme::skipped(),
        ClassStatus::Crashed => scheme::crashed(),
    }
}

fn write_colored(out: &mut dyn WriteColor, spec: &ColorSpec, text: &str) -> std::io::Result<()> {
    out.set_color(spec)?;
    write!(out, "{}", text)?;
    out.reset()
}

impl ReportFormatter for TextFormatter {
    fn write(&self, out: &mut dyn WriteColor, result: &RunResult) -> anyhow::Result<()> {
        for (class, outcome) in &result.classes {
            let label = format!("{:<STATUS_WIDTH$}", outcome.status.as_str().to_uppercase());
            write_colored(out, &status_spec(outcome.status), &label)?;
            write!(out, " ")?;
            write_colored(out, &scheme::class_name(), class)?;
            write!(out, " ({}", outcome.framework)?;
            if outcome.duration_ms > 0 {
                write!(out, ", {}", human_millis(outcome.duration_ms))?;
            }
            if outcome.attempts > 1 {
                write!(out, ", attempt {}", outcome.attempts)?;
            }
            writeln!(out, ")")?;

            if outcome.status != ClassStatus::Passed {
                for line in &outcome.failures {
                    out.set_color(&scheme::detail())?;
                    writeln!(out, "    {}", line)?;
                    out.reset()?;
                }
            }
        }

        if !result.diagnostics.is_empty() {
            writeln!(out)?;
            for diagnostic in &result.diagnostics {
                write!(out, "warning: ")?;
                write_colored(out, &scheme::path(), &diagnostic.path)?;
                writeln!(out, ": {}", diagnostic.message)?;
            }
        }

        let counts = result.counts();
        if counts.total() > 0 {
            writeln!(out)?;
        }
        writeln!(
            out,
            "{} classes: {} passed, {} failed, {} skipped, {} crashed ({})",
            counts.total(),
            counts.passed,
            counts.failed,
            counts.skipped,
            counts.crashed,
            human_millis(result.duration.as_millis() as u64)
        )?;
        if result.infrastructure_failure {
            writeln!(out, "infrastructure failure: workers could not be launched or sustained")?;
        }

        let (spec, verdict) = match result.verdict {
            Verdict::Success => (scheme::passed(), "SUCCESS"),
            Verdict::Failed => (scheme::failed(), "FAILED"),
            Verdict::Aborted => (scheme::crashed(), "ABORTED"),
        };
        write!(out, "result: ")?;
        write_colored(out, &spec, verdict)?;
        writeln!(out)?;
        Ok(())
    }
}
