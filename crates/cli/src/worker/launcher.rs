// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Starting workers and reading their event streams.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::launch::WorkerLaunchSpec;
use crate::processor::{CLASSPATH_ENV, MODULE_PATH_ENV};
use crate::protocol::{Directive, ProtocolError, WorkerEvent, read_frame, write_frame};

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;

/// Dispatcher-assigned worker identity, unique within a run.
pub type WorkerId = u64;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot pass {0} to a worker: {1}")]
    InvalidPath(&'static str, String),

    #[error("worker launcher unavailable: {0}")]
    Unavailable(String),
}

/// Something a worker's event reader observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Event(WorkerEvent),
    /// The event stream ended; `error` is set when it ended mid-frame or
    /// could not be decoded.
    Closed { error: Option<String> },
}

/// An event-stream message tagged with its worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerMessage {
    pub worker: WorkerId,
    pub body: MessageBody,
}

/// Forced-termination handle for the execution unit behind a worker.
pub trait WorkerControl: Send {
    /// Terminate the worker without waiting for it.
    fn kill(&mut self);

    /// Release the worker's resources once it has exited or been killed.
    fn reap(&mut self);
}

/// The dispatcher's side of one live worker.
pub struct WorkerConnection {
    directives: Option<Box<dyn Write + Send>>,
    control: Box<dyn WorkerControl>,
}

impl WorkerConnection {
    pub fn new(directives: Box<dyn Write + Send>, control: Box<dyn WorkerControl>) -> Self {
        Self {
            directives: Some(directives),
            control,
        }
    }

    pub fn send(&mut self, directive: &Directive) -> Result<(), ProtocolError> {
        match self.directives.as_mut() {
            Some(writer) => write_frame(writer, directive),
            None => Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "worker input already closed",
            ))),
        }
    }

    /// Close the directive stream; the worker treats end of input as `Stop`.
    pub fn close_input(&mut self) {
        self.directives = None;
    }

    pub fn kill(&mut self) {
        self.close_input();
        self.control.kill();
    }

    pub fn reap(&mut self) {
        self.close_input();
        self.control.reap();
    }
}

/// Starts one worker for a launch spec.
pub trait WorkerLauncher: Send + Sync {
    /// Start a worker whose events are delivered to `events` tagged with `worker`.
    fn launch(
        &self,
        spec: &WorkerLaunchSpec,
        worker: WorkerId,
        events: Sender<WorkerMessage>,
    ) -> Result<WorkerConnection, LaunchError>;
}

/// Decode frames from `reader` on a dedicated thread, forwarding each event
/// in order and finishing with exactly one `Closed` message.
pub fn spawn_event_reader<R: Read + Send + 'static>(
    worker: WorkerId,
    reader: R,
    tx: Sender<WorkerMessage>,
) {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let error = loop {
            match read_frame::<_, WorkerEvent>(&mut reader) {
                Ok(Some(event)) => {
                    let message = WorkerMessage {
                        worker,
                        body: MessageBody::Event(event),
                    };
                    if tx.send(message).is_err() {
                        return;
                    }
                }
                Ok(None) => break None,
                Err(e) => break Some(e.to_string()),
            }
        };
        let _ = tx.send(WorkerMessage {
            worker,
            body: MessageBody::Closed { error },
        });
    });
}

/// Launches workers as child processes of the `testmux` executable.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Launcher re-executing the running binary.
    pub fn current() -> Result<Self, LaunchError> {
        std::env::current_exe()
            .map(Self::new)
            .map_err(|e| LaunchError::Unavailable(format!("cannot locate current executable: {}", e)))
    }

    fn command(&self, spec: &WorkerLaunchSpec) -> Result<Command, LaunchError> {
        let mut command = Command::new(&self.program);
        command.arg("worker");
        for (key, value) in spec.properties() {
            command.arg("--prop").arg(format!("{}={}", key, value));
        }
        command.arg("--");
        command.args(spec.jvm_args.iter());

        let classpath = spec
            .joined_classpath()
            .map_err(|e| LaunchError::InvalidPath("classpath", e.to_string()))?;
        let module_path = spec
            .joined_module_path()
            .map_err(|e| LaunchError::InvalidPath("module path", e.to_string()))?;
        command
            .env(CLASSPATH_ENV, classpath)
            .env(MODULE_PATH_ENV, module_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        own_process_group(&mut command);
        Ok(command)
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(
        &self,
        spec: &WorkerLaunchSpec,
        worker: WorkerId,
        events: Sender<WorkerMessage>,
    ) -> Result<WorkerConnection, LaunchError> {
        let mut child = self
            .command(spec)?
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LaunchError::Unavailable("worker pipes were not captured".to_string()));
        };
        tracing::debug!(worker, pid = child.id(), "spawned worker process");

        spawn_event_reader(worker, stdout, events);
        Ok(WorkerConnection::new(
            Box::new(BufWriter::new(stdin)),
            Box::new(ChildControl { child, worker }),
        ))
    }
}

/// Start the worker as the leader of a new process group. Test launchers it
/// spawns join that group.
fn own_process_group(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = command;
}

/// SIGKILL the process group led by `child`; false if it could not be signalled.
#[cfg(unix)]
fn kill_process_group(child: &Child) -> bool {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        return false;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(pid, "killpg failed: {}", e);
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) -> bool {
    false
}

struct ChildControl {
    child: Child,
    worker: WorkerId,
}

impl WorkerControl for ChildControl {
    fn kill(&mut self) {
        if kill_process_group(&self.child) {
            return;
        }
        if let Err(e) = self.child.kill() {
            tracing::debug!(worker = self.worker, "kill failed: {}", e);
        }
    }

    fn reap(&mut self) {
        match self.child.wait() {
            Ok(status) => tracing::debug!(worker = self.worker, %status, "worker exited"),
            Err(e) => tracing::warn!("failed to reap worker {}: {}", self.worker, e),
        }
    }
}
