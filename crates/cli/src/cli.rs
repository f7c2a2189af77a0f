// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing with clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::color::ColorMode;

/// Runs JVM test suites across test frameworks in isolated workers
#[derive(Parser)]
#[command(name = "testmux")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Use specific config file
    #[arg(short = 'C', long = "config", global = true, env = "TESTMUX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect and run test classes
    Run(RunArgs),
    /// Serve the dispatcher protocol on stdin/stdout
    #[command(hide = true)]
    Worker(WorkerArgs),
    /// Print shell completions
    Completions(CompletionsArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Only consider classes whose name matches (e.g. `com.example.**`)
    #[arg(long = "filter", value_name = "GLOB")]
    pub filters: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    /// Color output mode
    #[arg(long, default_value = "auto", value_name = "WHEN")]
    pub color: ColorMode,

    /// Maximum concurrent workers
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Retries for classes left unresolved by a crashed worker
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Stop dispatching after the first failing class
    #[arg(long)]
    pub fail_fast: bool,

    /// Cancel the run after this long (e.g. `30m`)
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,
}

#[derive(clap::Args)]
pub struct WorkerArgs {
    /// System property passed to test launchers
    #[arg(long = "prop", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Runtime arguments passed to test launchers
    #[arg(last = true, value_name = "JVM_ARGS")]
    pub jvm_args: Vec<String>,
}

#[derive(clap::Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse `KEY=VALUE`; the value may contain further `=`.
pub fn parse_property(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", arg)),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
