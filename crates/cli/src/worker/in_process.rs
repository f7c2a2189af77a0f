// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Workers hosted on threads of the current process.
//!
//! Each worker still gets its own directive and event byte streams and its own
//! [`ServiceRegistry`], and the factory still crosses as encoded frames, so a
//! run through this launcher exercises the same protocol as a real process.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use super::launcher::{
    LaunchError, WorkerConnection, WorkerControl, WorkerId, WorkerLauncher, WorkerMessage,
    spawn_event_reader,
};
use super::pipe::pipe;
use super::serve;
use crate::launch::WorkerLaunchSpec;
use crate::processor::{ServiceRegistry, StopSignal, WorkerEnvironment};

type ServicesFn = dyn Fn(&WorkerLaunchSpec) -> ServiceRegistry + Send + Sync;

#[derive(Clone)]
pub struct InProcessLauncher {
    services: Arc<ServicesFn>,
    failures: Arc<AtomicUsize>,
    launches: Arc<AtomicUsize>,
}

impl InProcessLauncher {
    /// Workers get services built by `services` from their launch spec.
    pub fn new(
        services: impl Fn(&WorkerLaunchSpec) -> ServiceRegistry + Send + Sync + 'static,
    ) -> Self {
        Self {
            services: Arc::new(services),
            failures: Arc::new(AtomicUsize::new(0)),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Workers with the default services for their launch spec.
    pub fn with_default_services() -> Self {
        Self::new(|spec| ServiceRegistry::new(WorkerEnvironment::from_launch_spec(spec)))
    }

    /// Make the next `count` launches fail.
    pub fn fail_next_launches(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Workers successfully started so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl WorkerLauncher for InProcessLauncher {
    fn launch(
        &self,
        spec: &WorkerLaunchSpec,
        worker: WorkerId,
        events: Sender<WorkerMessage>,
    ) -> Result<WorkerConnection, LaunchError> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LaunchError::Unavailable(format!(
                "injected launch failure for worker {}",
                worker
            )));
        }

        let services = (self.services)(spec);
        let stop = services.stop_signal();
        let (directive_tx, directive_rx) = pipe();
        let (event_tx, event_rx) = pipe();

        let handle = std::thread::Builder::new()
            .name(format!("worker-{}", worker))
            .spawn(move || {
                if let Err(e) = serve(directive_rx, event_tx, services) {
                    tracing::debug!(worker, "in-process worker ended: {}", e);
                }
            })
            .map_err(|e| LaunchError::Unavailable(e.to_string()))?;

        self.launches.fetch_add(1, Ordering::SeqCst);
        spawn_event_reader(worker, event_rx, events);
        Ok(WorkerConnection::new(
            Box::new(directive_tx),
            Box::new(ThreadControl {
                stop,
                handle: Some(handle),
            }),
        ))
    }
}

struct ThreadControl {
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

impl WorkerControl for ThreadControl {
    fn kill(&mut self) {
        // Threads cannot be killed; the processor observes the stop request.
        self.stop.request();
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take_if(|h| h.is_finished()) {
            let _ = handle.join();
        }
    }
}
