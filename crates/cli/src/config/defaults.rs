// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized default values for configuration.
//!
//! Individual config structs delegate to these constants via their `default_*` functions.

/// Worker pool and batching defaults.
pub mod run {
    /// Test classes per batch for the fixed strategy.
    pub const BATCH_SIZE: usize = 16;

    /// Retries of a crashed or timed-out batch.
    pub const RETRIES: u32 = 1;

    /// Spawn attempts per worker before giving up.
    pub const LAUNCH_ATTEMPTS: u32 = 2;

    /// Upper bound on one test class.
    pub const CLASS_TIMEOUT: &str = "10m";

    /// How long a new worker may take to acknowledge its factory.
    pub const LAUNCH_TIMEOUT: &str = "30s";

    /// How long a stopping worker may take to finish.
    pub const GRACE_PERIOD: &str = "10s";

    /// Default worker count: available cores, at least one.
    pub fn max_parallel() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Name-pattern detection defaults (used when `scan = false`).
pub mod patterns {
    pub const INCLUDE: &[&str] = &["**/*Test.class", "**/*Tests.class", "**/Test*.class"];
}
