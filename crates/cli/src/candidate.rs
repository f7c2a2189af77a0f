// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Candidate class collection.
//!
//! Walks the configured class directories and loads every `.class` file as a
//! candidate for detection. Read failures are kept on the candidate so the
//! detector can report them instead of aborting the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use ignore::WalkBuilder;

#[cfg(test)]
#[path = "candidate_tests.rs"]
mod tests;

/// A compiled class offered for detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateClass {
    /// Path relative to its class directory (`com/acme/FooTest.class`).
    pub path: PathBuf,
    /// File bytes, or the reason they could not be read.
    pub content: Result<Vec<u8>, String>,
}

impl CandidateClass {
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), content: Ok(bytes) }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), content: Err(reason.into()) }
    }

    /// Binary class name derived from the relative path.
    pub fn class_name(&self) -> String {
        class_name_of(&self.path)
    }

    /// Relative path with forward slashes on every platform.
    pub fn relative_path(&self) -> String {
        slash_path(&self.path)
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn class_name_of(path: &Path) -> String {
    let rel = slash_path(path);
    rel.strip_suffix(".class").unwrap_or(&rel).replace('/', ".")
}

/// Narrows the candidate set by class name before detection.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    include: Option<GlobSet>,
}

impl CandidateFilter {
    pub fn new(include: Option<GlobSet>) -> Self {
        Self { include }
    }

    pub fn accepts(&self, class_name: &str) -> bool {
        self.include.as_ref().is_none_or(|set| set.is_match(class_name))
    }
}

/// Collect candidate classes from class directories.
///
/// Earlier directories shadow later ones for the same relative path, as on a
/// classpath. Results are sorted by relative path.
pub fn collect_candidates(dirs: &[PathBuf], filter: &CandidateFilter) -> Vec<CandidateClass> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            tracing::warn!("class directory does not exist: {}", dir.display());
            continue;
        }

        // Build output directories are usually gitignored; walk everything.
        let walker = WalkBuilder::new(dir).standard_filters(false).build();
        let mut found: Vec<CandidateClass> = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("failed to walk {}: {}", dir.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            if !is_class_file(path) {
                continue;
            }
            let Ok(rel) = path.strip_prefix(dir) else {
                continue;
            };

            if !filter.accepts(&class_name_of(rel)) || !seen.insert(slash_path(rel)) {
                continue;
            }
            found.push(match std::fs::read(path) {
                Ok(bytes) => CandidateClass::new(rel, bytes),
                Err(e) => CandidateClass::unreadable(rel, e.to_string()),
            });
        }

        tracing::debug!("{} candidate classes in {}", found.len(), dir.display());
        candidates.extend(found);
    }

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates
}

fn is_class_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|e| e == "class")
}
