// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `[[framework]]` entries.

use std::path::PathBuf;

use serde::Deserialize;

use super::defaults;
use crate::framework::FrameworkKind;

#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkConfig {
    pub kind: FrameworkKind,

    /// Display name; defaults to the kind. Must be unique within a run.
    #[serde(default)]
    pub name: Option<String>,

    /// Inspect bytecode (true) or match file names (false).
    #[serde(default = "FrameworkConfig::default_scan")]
    pub scan: bool,

    /// Class file patterns for name matching.
    #[serde(default = "FrameworkConfig::default_include")]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Launcher jars added to this framework's workers.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,

    /// Launcher command template override.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    #[serde(default)]
    pub options: OptionsConfig,
}

impl FrameworkConfig {
    pub fn new(kind: FrameworkKind) -> Self {
        Self {
            kind,
            name: None,
            scan: Self::default_scan(),
            include: Self::default_include(),
            exclude: Vec::new(),
            classpath: Vec::new(),
            command: None,
            options: OptionsConfig::default(),
        }
    }

    pub(super) fn default_scan() -> bool {
        true
    }

    pub(super) fn default_include() -> Vec<String> {
        defaults::patterns::INCLUDE.iter().map(|s| s.to_string()).collect()
    }
}

/// Union of every framework's options; validated against the kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    pub include_categories: Vec<String>,
    pub exclude_categories: Vec<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub include_engines: Vec<String>,
    pub exclude_engines: Vec<String>,
    pub include_groups: Vec<String>,
    pub exclude_groups: Vec<String>,
}

impl OptionsConfig {
    /// Names of non-empty options that `kind` does not understand.
    pub fn fields_outside(&self, kind: FrameworkKind) -> Vec<&'static str> {
        let fields: [(&'static str, &Vec<String>, FrameworkKind); 8] = [
            ("include_categories", &self.include_categories, FrameworkKind::Junit),
            ("exclude_categories", &self.exclude_categories, FrameworkKind::Junit),
            ("include_tags", &self.include_tags, FrameworkKind::JunitPlatform),
            ("exclude_tags", &self.exclude_tags, FrameworkKind::JunitPlatform),
            ("include_engines", &self.include_engines, FrameworkKind::JunitPlatform),
            ("exclude_engines", &self.exclude_engines, FrameworkKind::JunitPlatform),
            ("include_groups", &self.include_groups, FrameworkKind::Testng),
            ("exclude_groups", &self.exclude_groups, FrameworkKind::Testng),
        ];
        fields
            .into_iter()
            .filter(|(_, values, owner)| !values.is_empty() && *owner != kind)
            .map(|(name, _, _)| name)
            .collect()
    }
}
