// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test framework descriptors.
//!
//! A [`FrameworkDescriptor`] bundles everything one framework dialect
//! contributes to a run: how to detect its test classes, how to drive them
//! inside a worker, and how to adjust the worker launch. The dispatcher only
//! ever calls through the descriptor; framework identity is resolved here, at
//! configuration time.

pub mod junit;
pub mod platform;
pub mod testng;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, FrameworkConfig, OptionsConfig};
use crate::detect::{AnnotationDetector, Detector, NamePatternDetector};
use crate::launch::{ConfiguratorChain, WorkerConfigurator, WorkerLaunchSpec};
use crate::processor::FactoryRecipe;

use self::junit::{JUnitFactory, JUnitOptions};
use self::platform::{JUnitPlatformFactory, JUnitPlatformOptions};
use self::testng::{TestNgFactory, TestNgOptions};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// System property naming the framework a worker serves.
pub const FRAMEWORK_PROPERTY: &str = "testmux.framework";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameworkKind {
    Junit,
    JunitPlatform,
    Testng,
}

impl FrameworkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameworkKind::Junit => "junit",
            FrameworkKind::JunitPlatform => "junit-platform",
            FrameworkKind::Testng => "testng",
        }
    }

    fn dialect(self) -> &'static Dialect {
        match self {
            FrameworkKind::Junit => &junit::DIALECT,
            FrameworkKind::JunitPlatform => &platform::DIALECT,
            FrameworkKind::Testng => &testng::DIALECT,
        }
    }
}

/// Static facts about a framework dialect.
pub struct Dialect {
    /// Class-level annotations marking a test class.
    pub class_annotations: &'static [&'static str],
    /// Method-level annotations marking a test method.
    pub method_annotations: &'static [&'static str],
    /// Superclasses that make a class a test.
    pub base_classes: &'static [&'static str],
    /// Artifact names the worker needs on the module path when modular.
    pub required_modules: &'static [&'static str],
}

/// Framework-specific options, validated against the framework kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameworkOptions {
    JUnit(JUnitOptions),
    JUnitPlatform(JUnitPlatformOptions),
    TestNg(TestNgOptions),
}

impl FrameworkOptions {
    fn from_config(
        framework: &str,
        kind: FrameworkKind,
        options: &OptionsConfig,
    ) -> Result<Self, ConfigError> {
        let foreign = options.fields_outside(kind);
        if let Some(field) = foreign.first() {
            return Err(ConfigError::ForeignOption {
                framework: framework.to_string(),
                kind: kind.as_str(),
                option: (*field).to_string(),
            });
        }
        Ok(match kind {
            FrameworkKind::Junit => FrameworkOptions::JUnit(JUnitOptions {
                include_categories: options.include_categories.clone(),
                exclude_categories: options.exclude_categories.clone(),
            }),
            FrameworkKind::JunitPlatform => FrameworkOptions::JUnitPlatform(JUnitPlatformOptions {
                include_tags: options.include_tags.clone(),
                exclude_tags: options.exclude_tags.clone(),
                include_engines: options.include_engines.clone(),
                exclude_engines: options.exclude_engines.clone(),
            }),
            FrameworkKind::Testng => FrameworkOptions::TestNg(TestNgOptions {
                include_groups: options.include_groups.clone(),
                exclude_groups: options.exclude_groups.clone(),
            }),
        })
    }
}

/// One pluggable framework strategy for a run.
#[derive(Clone)]
pub struct FrameworkDescriptor {
    name: String,
    kind: FrameworkKind,
    detector: Arc<dyn Detector>,
    factory: FactoryRecipe,
    configurator: Arc<dyn WorkerConfigurator>,
    options: FrameworkOptions,
    required_modules: Vec<String>,
}

impl FrameworkDescriptor {
    /// Assemble a descriptor from its parts.
    pub fn new(
        name: impl Into<String>,
        kind: FrameworkKind,
        detector: Arc<dyn Detector>,
        factory: FactoryRecipe,
        configurator: Arc<dyn WorkerConfigurator>,
        options: FrameworkOptions,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            detector,
            factory,
            configurator,
            options,
            required_modules: owned(kind.dialect().required_modules),
        }
    }

    /// Build a descriptor from configuration.
    ///
    /// `class_timeout` bounds each launcher invocation inside the worker.
    pub fn from_config(
        config: &FrameworkConfig,
        class_timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let kind = config.kind;
        let name = config.name.clone().unwrap_or_else(|| kind.as_str().to_string());
        let options = FrameworkOptions::from_config(&name, kind, &config.options)?;

        if let Some(command) = &config.command
            && command.is_empty()
        {
            return Err(ConfigError::EmptyCommand { framework: name });
        }

        let detector: Arc<dyn Detector> = if config.scan {
            let dialect = kind.dialect();
            Arc::new(AnnotationDetector::new(
                owned(dialect.class_annotations),
                owned(dialect.method_annotations),
                owned(dialect.base_classes),
            ))
        } else {
            Arc::new(NamePatternDetector::new(
                build_glob_set(&name, &config.include)?,
                build_glob_set(&name, &config.exclude)?,
            ))
        };

        let command = config.command.clone();
        let factory = match &options {
            FrameworkOptions::JUnit(o) => FactoryRecipe::JUnit(JUnitFactory {
                options: o.clone(),
                command,
                class_timeout,
            }),
            FrameworkOptions::JUnitPlatform(o) => FactoryRecipe::JUnitPlatform(JUnitPlatformFactory {
                options: o.clone(),
                command,
                class_timeout,
            }),
            FrameworkOptions::TestNg(o) => FactoryRecipe::TestNg(TestNgFactory {
                options: o.clone(),
                command,
                class_timeout,
            }),
        };

        let configurator = Arc::new(FrameworkConfigurator {
            framework: name.clone(),
            classpath: config.classpath.clone(),
        });

        Ok(Self::new(name, kind, detector, factory, configurator, options))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FrameworkKind {
        self.kind
    }

    pub fn detector(&self) -> &dyn Detector {
        self.detector.as_ref()
    }

    pub fn factory(&self) -> &FactoryRecipe {
        &self.factory
    }

    /// Replace the dialect's default module requirements.
    pub fn with_required_modules(mut self, modules: Vec<String>) -> Self {
        self.required_modules = modules;
        self
    }

    /// The framework's configurator followed by module placement for
    /// [`required_modules`](Self::required_modules).
    pub fn configurator(&self) -> Arc<dyn WorkerConfigurator> {
        Arc::new(
            ConfiguratorChain::new()
                .then(Arc::clone(&self.configurator))
                .then(Arc::new(RequiredModules {
                    framework: self.name.clone(),
                    modules: self.required_modules.clone(),
                })),
        )
    }

    pub fn options(&self) -> &FrameworkOptions {
        &self.options
    }

    pub fn required_modules(&self) -> &[String] {
        &self.required_modules
    }
}

/// Adds a framework's launcher classpath and names the framework.
#[derive(Debug, Clone)]
pub struct FrameworkConfigurator {
    pub framework: String,
    pub classpath: Vec<PathBuf>,
}

impl WorkerConfigurator for FrameworkConfigurator {
    fn configure(&self, spec: &mut WorkerLaunchSpec) {
        spec.classpath.extend(self.classpath.iter().cloned());
        spec.add_property(FRAMEWORK_PROPERTY, self.framework.clone());
    }
}

/// Puts the classpath entries of required modules on the module path of a
/// modular launch.
///
/// Entries are copied, not moved: configurators only add, so the jars stay on
/// the classpath as well.
#[derive(Debug, Clone)]
struct RequiredModules {
    framework: String,
    modules: Vec<String>,
}

impl WorkerConfigurator for RequiredModules {
    fn configure(&self, spec: &mut WorkerLaunchSpec) {
        if !spec.modular {
            return;
        }
        for module in &self.modules {
            let found: Vec<PathBuf> = spec
                .classpath
                .iter()
                .filter(|entry| artifact_matches(entry, module))
                .cloned()
                .collect();
            if found.is_empty() {
                tracing::debug!("module {} not found on the classpath of {}", module, self.framework);
            }
            spec.module_path.extend(found);
        }
    }
}

/// Whether a classpath entry is the named artifact (`junit-4.13.2.jar` is `junit`).
pub fn artifact_matches(entry: &Path, artifact: &str) -> bool {
    let Some(stem) = entry.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    match stem.strip_prefix(artifact) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|version| version.starts_with(|c: char| c.is_ascii_digit())),
        None => false,
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn build_glob_set(framework: &str, patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
            context: format!("framework {}", framework),
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidGlob {
        context: format!("framework {}", framework),
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}
