// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run report output.
//!
//! Renders a [`RunResult`] as a per-class status table (text) or as a JSON
//! document. Every dispatched class appears exactly once.

mod json;
mod text;

use termcolor::{NoColor, WriteColor};

use crate::cli::OutputFormat;
use crate::dispatch::RunResult;

pub use json::JsonFormatter;
pub use text::TextFormatter;

/// Trait for formatting a run result.
pub trait ReportFormatter {
    /// Write the report, using color where `out` supports it.
    fn write(&self, out: &mut dyn WriteColor, result: &RunResult) -> anyhow::Result<()>;

    /// Format the report as an uncolored string.
    fn format(&self, result: &RunResult) -> anyhow::Result<String> {
        let mut buf = NoColor::new(Vec::new());
        self.write(&mut buf, result)?;
        Ok(String::from_utf8(buf.into_inner())?)
    }
}

/// Formatter for an output format.
pub fn formatter(format: OutputFormat) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Human-readable milliseconds.
pub fn human_millis(millis: u64) -> String {
    if millis >= 60_000 {
        format!("{}m{:02}s", millis / 60_000, (millis % 60_000) / 1000)
    } else if millis >= 1000 {
        format!("{:.1}s", millis as f64 / 1000.0)
    } else {
        format!("{}ms", millis)
    }
}
