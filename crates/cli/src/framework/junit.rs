// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JUnit 4.
//!
//! Category options become `JUnitCore --filter` arguments (JUnit 4.12+).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Dialect;
use crate::processor::{
    CommandProcessor, ExitCodePolicy, LaunchTemplate, Processor, ProcessorFactory, ServiceRegistry,
    WorkerError,
};

pub const DIALECT: Dialect = Dialect {
    class_annotations: &["Lorg/junit/runner/RunWith;"],
    method_annotations: &["Lorg/junit/Test;"],
    base_classes: &["junit.framework.TestCase"],
    required_modules: &["junit", "hamcrest-core"],
};

pub const DEFAULT_COMMAND: &[&str] = &[
    "java",
    "{module_args}",
    "{system_properties}",
    "{jvm_args}",
    "-cp",
    "{classpath}",
    "org.junit.runner.JUnitCore",
    "{options}",
    "{class}",
];

const INCLUDE_CATEGORIES_FILTER: &str = "org.junit.experimental.categories.IncludeCategories";
const EXCLUDE_CATEGORIES_FILTER: &str = "org.junit.experimental.categories.ExcludeCategories";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JUnitOptions {
    pub include_categories: Vec<String>,
    pub exclude_categories: Vec<String>,
}

impl JUnitOptions {
    pub fn launcher_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.include_categories.is_empty() {
            args.push(format!(
                "--filter={}={}",
                INCLUDE_CATEGORIES_FILTER,
                self.include_categories.join(",")
            ));
        }
        if !self.exclude_categories.is_empty() {
            args.push(format!(
                "--filter={}={}",
                EXCLUDE_CATEGORIES_FILTER,
                self.exclude_categories.join(",")
            ));
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JUnitFactory {
    pub options: JUnitOptions,
    pub command: Option<Vec<String>>,
    pub class_timeout: Option<Duration>,
}

impl JUnitFactory {
    pub fn template(&self) -> LaunchTemplate {
        LaunchTemplate {
            command: self
                .command
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()),
            options: self.options.launcher_args(),
            exit_codes: ExitCodePolicy::Exact { pass: vec![0], skip: Vec::new() },
            class_timeout: self.class_timeout,
        }
    }
}

impl ProcessorFactory for JUnitFactory {
    fn create(&self, services: &ServiceRegistry) -> Result<Box<dyn Processor>, WorkerError> {
        Ok(Box::new(CommandProcessor::new(self.template(), services)))
    }
}
