// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading and validation.
//!
//! `testmux.toml` is deserialized with serde, then validated into the typed
//! settings the dispatcher runs with. Every problem found here is a
//! [`ConfigError`] and aborts the run before any worker is spawned.

pub mod defaults;
mod framework;
mod run;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::dispatch::{BatchingStrategy, DispatchSettings};
use crate::framework::FrameworkDescriptor;
use crate::launch::BaseConfigurator;

pub use framework::{FrameworkConfig, OptionsConfig};
pub use run::{RunConfig, StrategyConfig, parse_duration};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Configuration file name looked up by discovery.
pub const CONFIG_FILE: &str = "testmux.toml";

/// Highest supported config `version`.
const CONFIG_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {file} found in {dir} or its parents", file = CONFIG_FILE, dir = .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config version {0} (expected {expected})", expected = CONFIG_VERSION)]
    UnsupportedVersion(i64),

    #[error("no test frameworks configured")]
    NoFrameworks,

    #[error("framework name {0:?} is used more than once")]
    DuplicateFramework(String),

    #[error("framework {framework} ({kind}) does not understand option {option}")]
    ForeignOption {
        framework: String,
        kind: &'static str,
        option: String,
    },

    #[error("framework {framework} has an empty launcher command")]
    EmptyCommand { framework: String },

    #[error("invalid glob {pattern:?} in {context}: {message}")]
    InvalidGlob {
        context: String,
        pattern: String,
        message: String,
    },

    #[error("invalid duration {value:?} for {field}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("invalid {field}: {message}")]
    InvalidSetting { field: &'static str, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_version")]
    pub version: i64,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default, rename = "framework")]
    pub frameworks: Vec<FrameworkConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            run: RunConfig::default(),
            frameworks: Vec::new(),
        }
    }
}

impl Config {
    fn default_version() -> i64 {
        CONFIG_VERSION
    }

    /// Validate dispatch settings.
    pub fn dispatch_settings(&self) -> Result<DispatchSettings, ConfigError> {
        let run = &self.run;
        if run.max_parallel == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "run.max_parallel",
                message: "must be at least 1".to_string(),
            });
        }
        if run.launch_attempts == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "run.launch_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        let strategy = match run.strategy {
            StrategyConfig::Fixed if run.batch_size == 0 => {
                return Err(ConfigError::InvalidSetting {
                    field: "run.batch_size",
                    message: "must be at least 1".to_string(),
                });
            }
            StrategyConfig::Fixed => BatchingStrategy::Fixed { size: run.batch_size },
            StrategyConfig::PerClass => BatchingStrategy::PerClass,
        };

        let launch_timeout = run::duration_field("run.launch_timeout", &run.launch_timeout)?;
        if launch_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                field: "run.launch_timeout",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(DispatchSettings {
            max_parallel: run.max_parallel,
            strategy,
            fork_every: (run.fork_every > 0).then_some(run.fork_every),
            retries: run.retries,
            launch_attempts: run.launch_attempts,
            class_timeout: self.class_timeout()?,
            launch_timeout,
            grace_period: run::duration_field("run.grace_period", &run.grace_period)?,
            fail_fast: run.fail_fast,
        })
    }

    /// Per-class timeout; `None` when disabled with `"0"`.
    pub fn class_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        let timeout = run::duration_field("run.class_timeout", &self.run.class_timeout)?;
        Ok((!timeout.is_zero()).then_some(timeout))
    }

    /// Build framework descriptors in configuration order.
    pub fn descriptors(&self) -> Result<Vec<FrameworkDescriptor>, ConfigError> {
        if self.frameworks.is_empty() {
            return Err(ConfigError::NoFrameworks);
        }
        let class_timeout = self.class_timeout()?;
        let mut names = HashSet::new();
        let mut descriptors = Vec::with_capacity(self.frameworks.len());
        for framework in &self.frameworks {
            let descriptor = FrameworkDescriptor::from_config(framework, class_timeout)?;
            if !names.insert(descriptor.name().to_string()) {
                return Err(ConfigError::DuplicateFramework(descriptor.name().to_string()));
            }
            descriptors.push(descriptor);
        }
        Ok(descriptors)
    }

    /// Run-level launch settings shared by every worker.
    pub fn base_configurator(&self) -> BaseConfigurator {
        BaseConfigurator {
            classpath: self.run.classpath.clone(),
            module_path: self.run.module_path.clone(),
            properties: self.run.properties.clone(),
            jvm_args: self.run.jvm_args.clone(),
            modular: self.run.modular,
        }
    }

    /// Make relative paths relative to `base` (the config file's directory).
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |paths: &mut Vec<PathBuf>| {
            for path in paths.iter_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        resolve(&mut self.run.classes);
        resolve(&mut self.run.classpath);
        resolve(&mut self.run.module_path);
        for framework in &mut self.frameworks {
            resolve(&mut framework.classpath);
        }
    }
}

/// Parse config content. Paths stay as written.
pub fn parse(content: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(config.version));
    }
    Ok(config)
}

/// Load and parse a config file, resolving paths against its directory.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse(&content, path)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    tracing::debug!(
        "loaded {} with {} framework(s)",
        path.display(),
        config.frameworks.len()
    );
    Ok(config)
}
