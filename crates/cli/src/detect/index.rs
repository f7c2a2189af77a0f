// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Superclass lookup over the candidate set.

use std::collections::HashMap;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::candidate::CandidateClass;
use crate::classfile::ClassSummary;

/// Deepest superclass chain followed before giving up (also breaks cycles).
const MAX_SUPER_DEPTH: usize = 64;

/// Parsed summaries of every readable candidate, keyed by binary name.
///
/// Inheritance answers are memoized per run, keyed by class name and the
/// asking detector's criteria fingerprint.
pub struct ClassIndex {
    classes: HashMap<String, ClassSummary>,
    inherited: DashMap<(String, u64), bool>,
}

impl ClassIndex {
    pub fn build(candidates: &[CandidateClass]) -> Self {
        let classes = candidates
            .par_iter()
            .filter_map(|c| c.content.as_ref().ok())
            .filter_map(|bytes| ClassSummary::parse(bytes).ok())
            .map(|summary| (summary.name.clone(), summary))
            .collect();
        Self { classes, inherited: DashMap::new() }
    }

    /// Whether some class on the superclass chain starting at `name` matches.
    ///
    /// `matches` receives each class name on the chain together with its
    /// summary when that class is part of the candidate set.
    pub fn chain_matches<F>(&self, name: &str, fingerprint: u64, matches: &F) -> bool
    where
        F: Fn(&str, Option<&ClassSummary>) -> bool,
    {
        self.chain_matches_at(name, fingerprint, matches, 0)
    }

    fn chain_matches_at<F>(&self, name: &str, fingerprint: u64, matches: &F, depth: usize) -> bool
    where
        F: Fn(&str, Option<&ClassSummary>) -> bool,
    {
        if depth >= MAX_SUPER_DEPTH {
            return false;
        }
        let key = (name.to_string(), fingerprint);
        if let Some(known) = self.inherited.get(&key) {
            return *known;
        }

        let summary = self.classes.get(name);
        let result = matches(name, summary)
            || summary
                .and_then(|s| s.super_name.as_deref())
                .is_some_and(|parent| self.chain_matches_at(parent, fingerprint, matches, depth + 1));

        // Depth cut-offs are not cached so a shorter query can still succeed.
        if depth == 0 || result {
            self.inherited.insert(key, result);
        }
        result
    }
}
