// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `testmux worker`: the bootstrap entry point of a worker process.

use testmux::cli::WorkerArgs;
use testmux::dispatch::exit_code;
use testmux::processor::{ServiceRegistry, WorkerEnvironment};
use testmux::worker;

pub fn run(args: &WorkerArgs) -> anyhow::Result<i32> {
    let environment =
        WorkerEnvironment::from_process(args.properties.iter().cloned().collect(), args.jvm_args.clone());
    tracing::debug!(
        pid = std::process::id(),
        classpath = environment.classpath.len(),
        "worker starting"
    );

    let services = ServiceRegistry::new(environment);
    worker::serve(std::io::stdin(), std::io::stdout(), services)?;
    Ok(exit_code::SUCCESS)
}
