// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JUnit Platform (Jupiter and other engines) via the console launcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Dialect;
use crate::processor::{
    CommandProcessor, ExitCodePolicy, LaunchTemplate, Processor, ProcessorFactory, ServiceRegistry,
    WorkerError,
};

pub const DIALECT: Dialect = Dialect {
    class_annotations: &[
        "Lorg/junit/platform/suite/api/Suite;",
        "Lorg/junit/platform/commons/annotation/Testable;",
    ],
    method_annotations: &[
        "Lorg/junit/jupiter/api/Test;",
        "Lorg/junit/jupiter/api/RepeatedTest;",
        "Lorg/junit/jupiter/api/TestFactory;",
        "Lorg/junit/jupiter/api/TestTemplate;",
        "Lorg/junit/jupiter/params/ParameterizedTest;",
    ],
    base_classes: &[],
    required_modules: &[
        "junit-platform-launcher",
        "junit-platform-engine",
        "junit-platform-commons",
    ],
};

pub const DEFAULT_COMMAND: &[&str] = &[
    "java",
    "{module_args}",
    "{system_properties}",
    "{jvm_args}",
    "-cp",
    "{classpath}",
    "org.junit.platform.console.ConsoleLauncher",
    "execute",
    "--disable-banner",
    "--fail-if-no-tests",
    "{options}",
    "--select-class",
    "{class}",
];

/// Console launcher exit code when `--fail-if-no-tests` finds nothing.
const NO_TESTS_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JUnitPlatformOptions {
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub include_engines: Vec<String>,
    pub exclude_engines: Vec<String>,
}

impl JUnitPlatformOptions {
    /// Console launcher filter arguments.
    pub fn launcher_args(&self) -> Vec<String> {
        let pairs = [
            ("--include-tag", &self.include_tags),
            ("--exclude-tag", &self.exclude_tags),
            ("--include-engine", &self.include_engines),
            ("--exclude-engine", &self.exclude_engines),
        ];
        pairs
            .into_iter()
            .flat_map(|(flag, values)| values.iter().flat_map(move |v| [flag.to_string(), v.clone()]))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JUnitPlatformFactory {
    pub options: JUnitPlatformOptions,
    pub command: Option<Vec<String>>,
    pub class_timeout: Option<Duration>,
}

impl JUnitPlatformFactory {
    pub fn template(&self) -> LaunchTemplate {
        LaunchTemplate {
            command: self
                .command
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()),
            options: self.options.launcher_args(),
            exit_codes: ExitCodePolicy::Exact {
                pass: vec![0],
                skip: vec![NO_TESTS_EXIT_CODE],
            },
            class_timeout: self.class_timeout,
        }
    }
}

impl ProcessorFactory for JUnitPlatformFactory {
    fn create(&self, services: &ServiceRegistry) -> Result<Box<dyn Processor>, WorkerError> {
        if services.environment().classpath.is_empty() && services.environment().module_path.is_empty() {
            tracing::warn!("junit platform worker started with an empty classpath");
        }
        Ok(Box::new(CommandProcessor::new(self.template(), services)))
    }
}
