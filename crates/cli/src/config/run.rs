// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `[run]` section: classes, worker launch, and dispatch settings.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;
use super::defaults;

/// How accepted classes are grouped onto workers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyConfig {
    /// Many classes per batch; workers are reused.
    #[default]
    Fixed,
    /// One class per fresh worker.
    PerClass,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directories holding candidate class files.
    pub classes: Vec<PathBuf>,
    /// Worker classpath (test classes, dependencies).
    pub classpath: Vec<PathBuf>,
    pub module_path: Vec<PathBuf>,
    pub modular: bool,
    pub jvm_args: Vec<String>,
    pub properties: BTreeMap<String, String>,

    pub max_parallel: usize,
    pub strategy: StrategyConfig,
    pub batch_size: usize,
    /// Batches a reused worker may run before it is replaced (0 = unlimited).
    pub fork_every: usize,
    pub retries: u32,
    pub launch_attempts: u32,

    /// Durations such as "500ms", "30s", "5m", "1h"; "0" disables.
    pub class_timeout: String,
    pub launch_timeout: String,
    pub grace_period: String,

    pub fail_fast: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            classpath: Vec::new(),
            module_path: Vec::new(),
            modular: false,
            jvm_args: Vec::new(),
            properties: BTreeMap::new(),
            max_parallel: defaults::run::max_parallel(),
            strategy: StrategyConfig::default(),
            batch_size: defaults::run::BATCH_SIZE,
            fork_every: 0,
            retries: defaults::run::RETRIES,
            launch_attempts: defaults::run::LAUNCH_ATTEMPTS,
            class_timeout: defaults::run::CLASS_TIMEOUT.to_string(),
            launch_timeout: defaults::run::LAUNCH_TIMEOUT.to_string(),
            grace_period: defaults::run::GRACE_PERIOD.to_string(),
            fail_fast: false,
        }
    }
}

/// Parse a duration like `250ms`, `30s`, `5m`, `2h`, or a bare number of seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let millis = match unit.trim() {
        "ms" => amount,
        "" | "s" => amount.checked_mul(1_000)?,
        "m" => amount.checked_mul(60_000)?,
        "h" => amount.checked_mul(3_600_000)?,
        _ => return None,
    };
    Some(Duration::from_millis(millis))
}

/// Parse a configured duration, naming the field on error.
pub(super) fn duration_field(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}
