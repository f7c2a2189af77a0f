// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bytecode-inspecting detector.
//!
//! A class is a test when it is concrete and either it or a superclass carries
//! one of the framework's class annotations, declares a method with one of the
//! framework's test-method annotations, or extends one of its base classes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{Decision, DetectionContext, Detector};
use crate::candidate::CandidateClass;
use crate::classfile::ClassSummary;

#[derive(Debug, Clone)]
pub struct AnnotationDetector {
    class_annotations: Vec<String>,
    method_annotations: Vec<String>,
    base_classes: Vec<String>,
    fingerprint: u64,
}

impl AnnotationDetector {
    /// Create a detector.
    ///
    /// Annotations are type descriptors (`Lorg/junit/Test;`); base classes
    /// are binary names (`junit.framework.TestCase`).
    pub fn new(
        class_annotations: Vec<String>,
        method_annotations: Vec<String>,
        base_classes: Vec<String>,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        class_annotations.hash(&mut hasher);
        method_annotations.hash(&mut hasher);
        base_classes.hash(&mut hasher);
        Self {
            class_annotations,
            method_annotations,
            base_classes,
            fingerprint: hasher.finish(),
        }
    }

    fn declares_tests(&self, summary: &ClassSummary) -> bool {
        summary
            .class_annotations
            .iter()
            .any(|a| self.class_annotations.contains(a))
            || summary
                .method_annotations
                .iter()
                .any(|a| self.method_annotations.contains(a))
    }

    fn is_runnable(summary: &ClassSummary) -> bool {
        let access = summary.access;
        !(access.is_interface()
            || access.is_abstract()
            || access.is_module()
            || access.is_synthetic()
            || summary.is_anonymous())
    }
}

impl Detector for AnnotationDetector {
    fn classify(&self, candidate: &CandidateClass, ctx: &DetectionContext<'_>) -> Decision {
        let bytes = match &candidate.content {
            Ok(bytes) => bytes,
            Err(reason) => {
                ctx.diagnostics.report(candidate, format!("unreadable class file: {}", reason));
                return Decision::NotTest;
            }
        };

        let summary = match ClassSummary::parse(bytes) {
            Ok(summary) => summary,
            Err(e) => {
                ctx.diagnostics.report(candidate, format!("malformed class file: {}", e));
                return Decision::NotTest;
            }
        };

        if !Self::is_runnable(&summary) {
            return Decision::NotTest;
        }
        if self.declares_tests(&summary) {
            return Decision::Test;
        }

        let inherits = summary.super_name.as_deref().is_some_and(|parent| {
            ctx.index.chain_matches(parent, self.fingerprint, &|name, found| {
                self.base_classes.iter().any(|b| b == name)
                    || found.is_some_and(|s| self.declares_tests(s))
            })
        });

        if inherits { Decision::Test } else { Decision::NotTest }
    }
}
