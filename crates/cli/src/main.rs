// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use testmux::cli::{Cli, Command};
use testmux::config::ConfigError;
use testmux::dispatch::exit_code;

mod cmd_run;
mod cmd_worker;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TESTMUX_LOG";

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Run(args) => cmd_run::run(cli.config.as_deref(), args),
        Command::Worker(args) => cmd_worker::run(args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            clap_complete::generate(args.shell, &mut command, "testmux", &mut std::io::stdout());
            Ok(exit_code::SUCCESS)
        }
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("testmux: {:#}", e);
            if e.chain().any(|cause| cause.is::<ConfigError>()) {
                exit_code::CONFIG_ERROR
            } else {
                exit_code::INFRASTRUCTURE
            }
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
