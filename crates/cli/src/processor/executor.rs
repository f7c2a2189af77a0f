// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Execution of a single test class as a child process.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

use super::{StopSignal, WorkerError};
use crate::protocol::OutputStream;

/// How often the executor checks for timeouts and stop requests.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long to keep draining output after killing the launcher. Grandchildren
/// can hold the pipes open after the launcher itself is gone.
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub class: String,
    pub argv: Vec<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEnd {
    Exited,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub end: ExecutionEnd,
}

/// Runs one test class and streams its output.
pub trait ClassExecutor: Send + Sync {
    /// Execute `request`, passing each output line to `output` as it arrives.
    ///
    /// Must return promptly once `stop` is requested. An error means the
    /// worker cannot run tests at all.
    fn execute(
        &self,
        request: &ExecutionRequest,
        stop: &StopSignal,
        output: &mut dyn FnMut(OutputStream, String),
    ) -> Result<ExecutionOutcome, WorkerError>;
}

/// Executes the rendered launcher command with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl ClassExecutor for CommandExecutor {
    fn execute(
        &self,
        request: &ExecutionRequest,
        stop: &StopSignal,
        output: &mut dyn FnMut(OutputStream, String),
    ) -> Result<ExecutionOutcome, WorkerError> {
        let executor_error = |message: String| WorkerError::Executor {
            class: request.class.clone(),
            message,
        };

        let Some((program, args)) = request.argv.split_first() else {
            return Err(executor_error("empty launcher command".to_string()));
        };

        let started = Instant::now();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| executor_error(format!("failed to start {}: {}", program, e)))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, OutputStream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, OutputStream::Stderr, tx);
        } else {
            drop(tx);
        }

        let mut end = ExecutionEnd::Exited;
        let mut killed_at: Option<Instant> = None;
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok((stream, line)) => output(stream, line),
                // Both pipes closed: the child (and anything holding its pipes) is done.
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            if let Some(at) = killed_at {
                if at.elapsed() >= DRAIN_AFTER_KILL {
                    break;
                }
                continue;
            }
            if stop.is_requested() {
                end = ExecutionEnd::Cancelled;
            } else if request.timeout.is_some_and(|t| started.elapsed() >= t) {
                end = ExecutionEnd::TimedOut;
            } else {
                continue;
            }
            tracing::debug!(class = %request.class, ?end, "killing test launcher");
            if let Err(e) = child.kill() {
                tracing::warn!("failed to kill launcher for {}: {}", request.class, e);
            }
            killed_at = Some(Instant::now());
        }

        let status = child
            .wait()
            .map_err(|e| executor_error(format!("failed to wait for launcher: {}", e)))?;

        Ok(ExecutionOutcome {
            exit_code: status.code(),
            duration: started.elapsed(),
            end,
        })
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    pipe: R,
    stream: OutputStream,
    tx: Sender<(OutputStream, String)>,
) {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
