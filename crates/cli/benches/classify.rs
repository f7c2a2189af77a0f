// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test detection benchmarks.
//!
//! Classifies synthesized candidate sets of increasing size against one and
//! several framework detectors. Every third class extends the previous one
//! so the inheritance walk is exercised.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use testmux::candidate::CandidateClass;
use testmux::config::FrameworkConfig;
use testmux::detect::{Detector, classify_all};
use testmux::framework::{FrameworkDescriptor, FrameworkKind};

/// Minimal class file: one optional method annotation, optional superclass.
fn class_bytes(name: &str, super_name: &str, annotation: Option<&str>) -> Vec<u8> {
    let mut pool: Vec<u8> = Vec::new();
    let mut count: u16 = 1;
    let mut utf8 = |pool: &mut Vec<u8>, value: &str| {
        pool.push(1);
        pool.extend_from_slice(&(value.len() as u16).to_be_bytes());
        pool.extend_from_slice(value.as_bytes());
        count += 1;
        count - 1
    };
    let this_name = utf8(&mut pool, name);
    let super_utf8 = utf8(&mut pool, super_name);
    let attr = utf8(&mut pool, "RuntimeVisibleAnnotations");
    let method = utf8(&mut pool, "test");
    let descriptor = utf8(&mut pool, "()V");
    let annotation = annotation.map(|a| utf8(&mut pool, a));
    let mut class = |pool: &mut Vec<u8>, name_index: u16| {
        pool.push(7);
        pool.extend_from_slice(&name_index.to_be_bytes());
        count += 1;
        count - 1
    };
    let this_class = class(&mut pool, this_name);
    let super_class = class(&mut pool, super_utf8);

    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&[0, 0, 0, 52]);
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&pool);
    out.extend_from_slice(&0x0021u16.to_be_bytes());
    out.extend_from_slice(&this_class.to_be_bytes());
    out.extend_from_slice(&super_class.to_be_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]);
    match annotation {
        Some(type_index) => {
            out.extend_from_slice(&[0, 1, 0, 1]);
            out.extend_from_slice(&method.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            out.extend_from_slice(&[0, 1]);
            out.extend_from_slice(&attr.to_be_bytes());
            out.extend_from_slice(&6u32.to_be_bytes());
            out.extend_from_slice(&[0, 1]);
            out.extend_from_slice(&type_index.to_be_bytes());
            out.extend_from_slice(&[0, 0]);
        }
        None => out.extend_from_slice(&[0, 0]),
    }
    out.extend_from_slice(&[0, 0]);
    out
}

fn candidates(count: usize) -> Vec<CandidateClass> {
    (0..count)
        .map(|i| {
            let name = format!("com/acme/pkg{}/Case{}Test", i % 10, i);
            let (super_name, annotation) = match i % 3 {
                0 => ("java/lang/Object".to_string(), Some("Lorg/junit/Test;")),
                1 => (format!("com/acme/pkg{}/Case{}Test", (i - 1) % 10, i - 1), None),
                _ => ("java/lang/Object".to_string(), None),
            };
            CandidateClass::new(
                format!("{}.class", name),
                class_bytes(&name, &super_name, annotation),
            )
        })
        .collect()
}

fn descriptor(kind: FrameworkKind) -> FrameworkDescriptor {
    FrameworkDescriptor::from_config(&FrameworkConfig::new(kind), None).unwrap()
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let junit = descriptor(FrameworkKind::Junit);
    let platform = descriptor(FrameworkKind::JunitPlatform);
    let testng = descriptor(FrameworkKind::Testng);

    for size in [50, 500, 5000] {
        let candidates = candidates(size);

        let one: Vec<&dyn Detector> = vec![junit.detector()];
        group.bench_with_input(BenchmarkId::new("one_framework", size), &candidates, |b, c| {
            b.iter(|| black_box(classify_all(c, &one)))
        });

        let three: Vec<&dyn Detector> = vec![testng.detector(), platform.detector(), junit.detector()];
        group.bench_with_input(BenchmarkId::new("three_frameworks", size), &candidates, |b, c| {
            b.iter(|| black_box(classify_all(c, &three)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
