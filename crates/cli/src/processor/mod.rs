// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test processors and the recipes that build them inside a worker.
//!
//! A [`FactoryRecipe`] is plain data: it crosses the process boundary as part
//! of the `Init` directive and is turned into a live [`Processor`] by calling
//! [`ProcessorFactory::create`] with the worker's own [`ServiceRegistry`].
//! Nothing from the dispatcher's address space survives the trip.

mod command;
mod executor;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::framework::junit::JUnitFactory;
use crate::framework::platform::JUnitPlatformFactory;
use crate::framework::testng::TestNgFactory;
use crate::launch::WorkerLaunchSpec;
use crate::protocol::{BatchId, ProtocolError, WorkerEvent};

pub use command::{CommandProcessor, ExitCodePolicy, LaunchTemplate};
pub use executor::{
    ClassExecutor, CommandExecutor, ExecutionEnd, ExecutionOutcome, ExecutionRequest,
};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Environment variable carrying the worker classpath.
pub const CLASSPATH_ENV: &str = "TESTMUX_CLASSPATH";
/// Environment variable carrying the worker module path.
pub const MODULE_PATH_ENV: &str = "TESTMUX_MODULE_PATH";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker received {0} before Init")]
    NotInitialized(&'static str),

    #[error("processor used before start_processing")]
    NotStarted,

    #[error("failed to create processor: {0}")]
    Factory(String),

    #[error("cannot execute {class}: {message}")]
    Executor { class: String, message: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Launch settings as seen from inside the worker process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerEnvironment {
    pub classpath: Vec<PathBuf>,
    pub module_path: Vec<PathBuf>,
    pub properties: BTreeMap<String, String>,
    pub jvm_args: Vec<String>,
}

impl WorkerEnvironment {
    /// Environment a worker launched from `spec` observes.
    pub fn from_launch_spec(spec: &WorkerLaunchSpec) -> Self {
        Self {
            classpath: spec.classpath.as_slice().to_vec(),
            module_path: spec.module_path.as_slice().to_vec(),
            properties: spec.properties().clone(),
            jvm_args: spec.jvm_args.as_slice().to_vec(),
        }
    }

    /// Environment of the current worker process.
    pub fn from_process(properties: BTreeMap<String, String>, jvm_args: Vec<String>) -> Self {
        let split = |var: &str| {
            std::env::var_os(var)
                .map(|v| std::env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
                .unwrap_or_default()
        };
        Self {
            classpath: split(CLASSPATH_ENV),
            module_path: split(MODULE_PATH_ENV),
            properties,
            jvm_args,
        }
    }
}

/// Cooperative cancellation flag shared inside one worker.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Worker-local capabilities a factory may use.
#[derive(Clone)]
pub struct ServiceRegistry {
    environment: WorkerEnvironment,
    executor: Arc<dyn ClassExecutor>,
    stop: StopSignal,
}

impl ServiceRegistry {
    pub fn new(environment: WorkerEnvironment) -> Self {
        Self {
            environment,
            executor: Arc::new(CommandExecutor),
            stop: StopSignal::new(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ClassExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn environment(&self) -> &WorkerEnvironment {
        &self.environment
    }

    pub fn executor(&self) -> Arc<dyn ClassExecutor> {
        Arc::clone(&self.executor)
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}

/// Where a processor sends its events. Cheap to clone; ordering is preserved
/// for events sent from one thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<WorkerEvent>,
}

impl EventSink {
    pub fn new(tx: Sender<WorkerEvent>) -> Self {
        Self { tx }
    }

    /// Send an event. Returns false once the receiving side is gone.
    pub fn emit(&self, event: WorkerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Drives test classes inside a worker.
pub trait Processor: Send {
    /// Attach the sink all subsequent events go to.
    fn start_processing(&mut self, sink: EventSink);

    /// Run `classes` in order, emitting events as each class completes, then
    /// `BatchEnd`. Returns an error when the worker can no longer continue.
    fn process_batch(&mut self, batch_id: BatchId, classes: &[String]) -> Result<(), WorkerError>;

    /// Flush and release all state.
    fn stop(&mut self);
}

/// Builds a processor from worker-local services.
pub trait ProcessorFactory {
    fn create(&self, services: &ServiceRegistry) -> Result<Box<dyn Processor>, WorkerError>;
}

/// Serializable factory for every supported framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactoryRecipe {
    JUnit(JUnitFactory),
    JUnitPlatform(JUnitPlatformFactory),
    TestNg(TestNgFactory),
}

impl FactoryRecipe {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

impl ProcessorFactory for FactoryRecipe {
    fn create(&self, services: &ServiceRegistry) -> Result<Box<dyn Processor>, WorkerError> {
        match self {
            FactoryRecipe::JUnit(f) => f.create(services),
            FactoryRecipe::JUnitPlatform(f) => f.create(services),
            FactoryRecipe::TestNg(f) => f.create(services),
        }
    }
}
