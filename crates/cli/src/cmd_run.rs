// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `testmux run`: detect test classes and dispatch them to workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use globset::{Glob, GlobSetBuilder};
use termcolor::StandardStream;

use testmux::candidate::{CandidateFilter, collect_candidates};
use testmux::cli::RunArgs;
use testmux::config::{self, Config, ConfigError, parse_duration};
use testmux::discovery;
use testmux::dispatch::Dispatcher;
use testmux::report;
use testmux::worker::ProcessLauncher;

pub fn run(config_path: Option<&Path>, args: &RunArgs) -> anyhow::Result<i32> {
    let path = resolve_config_path(config_path)?;
    let mut config = config::load(&path)?;
    apply_overrides(&mut config, args);

    let settings = config.dispatch_settings()?;
    let descriptors = config.descriptors()?;
    if config.run.classes.is_empty() {
        return Err(ConfigError::InvalidSetting {
            field: "run.classes",
            message: "no class directories configured".to_string(),
        }
        .into());
    }
    let run_timeout = args
        .timeout
        .as_deref()
        .map(|value| {
            parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
                field: "--timeout",
                value: value.to_string(),
            })
        })
        .transpose()?;
    let filter = candidate_filter(&args.filters)?;

    let candidates = collect_candidates(&config.run.classes, &filter);
    tracing::debug!("{} candidate classes", candidates.len());

    let launcher = ProcessLauncher::current().context("cannot start workers")?;
    let mut dispatcher = Dispatcher::new(&descriptors, &launcher, settings)
        .with_base_configurator(Arc::new(config.base_configurator()));
    if let Some(timeout) = run_timeout {
        dispatcher = dispatcher.with_run_timeout(timeout);
    }
    let result = dispatcher.run(&candidates);

    let mut stdout = StandardStream::stdout(args.color.resolve());
    report::formatter(args.output)
        .write(&mut stdout, &result)
        .context("failed to write report")?;
    Ok(result.exit_code())
}

fn resolve_config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    discovery::find_config(&cwd).ok_or_else(|| ConfigError::NotFound(cwd).into())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(max_parallel) = args.max_parallel {
        config.run.max_parallel = max_parallel;
    }
    if let Some(retries) = args.retries {
        config.run.retries = retries;
    }
    if args.fail_fast {
        config.run.fail_fast = true;
    }
}

fn candidate_filter(patterns: &[String]) -> Result<CandidateFilter, ConfigError> {
    if patterns.is_empty() {
        return Ok(CandidateFilter::default());
    }
    let invalid = |pattern: &str, e: globset::Error| ConfigError::InvalidGlob {
        context: "--filter".to_string(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    };
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| invalid(pattern, e))?);
    }
    let set = builder.build().map_err(|e| invalid(&patterns.join(", "), e))?;
    Ok(CandidateFilter::new(Some(set)))
}
