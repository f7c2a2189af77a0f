// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Processor that runs each test class through a framework launcher command.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    ClassExecutor, EventSink, ExecutionEnd, ExecutionOutcome, ExecutionRequest, Processor,
    ServiceRegistry, StopSignal, WorkerEnvironment, WorkerError,
};
use crate::protocol::{BatchId, ClassStatus, OutputStream, WorkerEvent};

/// Output lines attached to a failed class result.
const FAILURE_TAIL_LINES: usize = 20;

/// How a launcher's exit code maps to a class status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitCodePolicy {
    /// Listed codes pass or skip; anything else fails.
    Exact { pass: Vec<i32>, skip: Vec<i32> },
    /// TestNG result bits: 1 failure, 2 skipped, 4 failed-within-success,
    /// 8 no tests.
    TestNgBits,
}

impl ExitCodePolicy {
    pub fn status(&self, code: i32) -> ClassStatus {
        match self {
            ExitCodePolicy::Exact { pass, skip } => {
                if pass.contains(&code) {
                    ClassStatus::Passed
                } else if skip.contains(&code) {
                    ClassStatus::Skipped
                } else {
                    ClassStatus::Failed
                }
            }
            ExitCodePolicy::TestNgBits => {
                if code & (1 | 4) != 0 || code < 0 {
                    ClassStatus::Failed
                } else if code & 8 != 0 || code == 2 {
                    ClassStatus::Skipped
                } else if code == 0 {
                    ClassStatus::Passed
                } else {
                    ClassStatus::Failed
                }
            }
        }
    }
}

/// A launcher command line with placeholders.
///
/// Whole-argument placeholders expand to zero or more arguments:
/// `{jvm_args}`, `{system_properties}`, `{module_args}`, `{options}`.
/// Inline placeholders are substituted inside any argument: `{class}`,
/// `{classpath}`, `{module_path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTemplate {
    pub command: Vec<String>,
    pub options: Vec<String>,
    pub exit_codes: ExitCodePolicy,
    pub class_timeout: Option<Duration>,
}

impl LaunchTemplate {
    pub fn render(&self, class: &str, env: &WorkerEnvironment) -> Vec<String> {
        let classpath = join(&env.classpath);
        let module_path = join(&env.module_path);
        let mut argv = Vec::with_capacity(self.command.len() + self.options.len());

        for arg in &self.command {
            match arg.as_str() {
                "{jvm_args}" => argv.extend(env.jvm_args.iter().cloned()),
                "{system_properties}" => {
                    argv.extend(env.properties.iter().map(|(k, v)| format!("-D{}={}", k, v)));
                }
                "{module_args}" => {
                    if !env.module_path.is_empty() {
                        argv.push("--module-path".to_string());
                        argv.push(module_path.clone());
                        argv.push("--add-modules".to_string());
                        argv.push("ALL-MODULE-PATH".to_string());
                    }
                }
                "{options}" => argv.extend(self.options.iter().cloned()),
                _ => argv.push(
                    arg.replace("{classpath}", &classpath)
                        .replace("{module_path}", &module_path)
                        .replace("{class}", class),
                ),
            }
        }
        argv
    }
}

fn join(paths: &[std::path::PathBuf]) -> String {
    std::env::join_paths(paths)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| {
            paths
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>()
                .join(":")
        })
}

/// Runs every class of a batch through the executor, one at a time.
pub struct CommandProcessor {
    template: LaunchTemplate,
    environment: WorkerEnvironment,
    executor: Arc<dyn ClassExecutor>,
    stop: StopSignal,
    sink: Option<EventSink>,
}

impl CommandProcessor {
    pub fn new(template: LaunchTemplate, services: &ServiceRegistry) -> Self {
        Self {
            template,
            environment: services.environment().clone(),
            executor: services.executor(),
            stop: services.stop_signal(),
            sink: None,
        }
    }

    pub fn template(&self) -> &LaunchTemplate {
        &self.template
    }

    fn run_class(&self, sink: &EventSink, class: &str) -> Result<bool, WorkerError> {
        sink.emit(WorkerEvent::ClassStart { class: class.to_string() });

        let request = ExecutionRequest {
            class: class.to_string(),
            argv: self.template.render(class, &self.environment),
            timeout: self.template.class_timeout,
        };

        let mut tail: VecDeque<String> = VecDeque::with_capacity(FAILURE_TAIL_LINES);
        let mut on_line = |stream: OutputStream, line: String| {
            if tail.len() == FAILURE_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.clone());
            sink.emit(WorkerEvent::Output { class: class.to_string(), stream, line });
        };
        let outcome = self.executor.execute(&request, &self.stop, &mut on_line)?;

        let Some((status, failures)) = self.judge(&outcome, tail) else {
            // Interrupted by a stop request; the class has no result.
            tracing::debug!(class, "class interrupted by stop request");
            return Ok(false);
        };

        sink.emit(WorkerEvent::ClassResult {
            class: class.to_string(),
            status,
            duration_ms: outcome.duration.as_millis() as u64,
            failures,
        });
        Ok(true)
    }

    fn judge(
        &self,
        outcome: &ExecutionOutcome,
        tail: VecDeque<String>,
    ) -> Option<(ClassStatus, Vec<String>)> {
        match outcome.end {
            ExecutionEnd::Cancelled => None,
            ExecutionEnd::TimedOut => {
                let mut failures = vec![format!(
                    "timed out after {}ms",
                    outcome.duration.as_millis()
                )];
                failures.extend(tail);
                Some((ClassStatus::Failed, failures))
            }
            ExecutionEnd::Exited => {
                let status = match outcome.exit_code {
                    Some(code) => self.template.exit_codes.status(code),
                    None => ClassStatus::Failed,
                };
                let failures = if status == ClassStatus::Failed {
                    let mut failures = vec![match outcome.exit_code {
                        Some(code) => format!("launcher exited with code {}", code),
                        None => "launcher terminated by signal".to_string(),
                    }];
                    failures.extend(tail);
                    failures
                } else {
                    Vec::new()
                };
                Some((status, failures))
            }
        }
    }
}

impl Processor for CommandProcessor {
    fn start_processing(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    fn process_batch(&mut self, batch_id: BatchId, classes: &[String]) -> Result<(), WorkerError> {
        let sink = self.sink.clone().ok_or(WorkerError::NotStarted)?;

        for class in classes {
            if self.stop.is_requested() {
                tracing::debug!(batch = batch_id, "stop requested; leaving batch early");
                break;
            }
            if !self.run_class(&sink, class)? {
                break;
            }
        }

        sink.emit(WorkerEvent::BatchEnd { batch_id });
        Ok(())
    }

    fn stop(&mut self) {
        self.sink = None;
    }
}
