// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TestNG.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Dialect;
use crate::processor::{
    CommandProcessor, ExitCodePolicy, LaunchTemplate, Processor, ProcessorFactory, ServiceRegistry,
    WorkerError,
};

pub const DIALECT: Dialect = Dialect {
    class_annotations: &["Lorg/testng/annotations/Test;"],
    method_annotations: &["Lorg/testng/annotations/Test;"],
    base_classes: &[],
    required_modules: &["testng", "jcommander"],
};

pub const DEFAULT_COMMAND: &[&str] = &[
    "java",
    "{module_args}",
    "{system_properties}",
    "{jvm_args}",
    "-cp",
    "{classpath}",
    "org.testng.TestNG",
    "{options}",
    "-testclass",
    "{class}",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestNgOptions {
    pub include_groups: Vec<String>,
    pub exclude_groups: Vec<String>,
}

impl TestNgOptions {
    pub fn launcher_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.include_groups.is_empty() {
            args.push("-groups".to_string());
            args.push(self.include_groups.join(","));
        }
        if !self.exclude_groups.is_empty() {
            args.push("-excludegroups".to_string());
            args.push(self.exclude_groups.join(","));
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestNgFactory {
    pub options: TestNgOptions,
    pub command: Option<Vec<String>>,
    pub class_timeout: Option<Duration>,
}

impl TestNgFactory {
    pub fn template(&self) -> LaunchTemplate {
        LaunchTemplate {
            command: self
                .command
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()),
            options: self.options.launcher_args(),
            exit_codes: ExitCodePolicy::TestNgBits,
            class_timeout: self.class_timeout,
        }
    }
}

impl ProcessorFactory for TestNgFactory {
    fn create(&self, services: &ServiceRegistry) -> Result<Box<dyn Processor>, WorkerError> {
        Ok(Box::new(CommandProcessor::new(self.template(), services)))
    }
}
