//! Shared unit test utilities.
//!
//! Provides class file synthesis, a scripted class executor and in-process
//! launchers for unit tests in the cli crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::candidate::CandidateClass;
use crate::config::FrameworkConfig;
use crate::framework::{FrameworkDescriptor, FrameworkKind};
use crate::processor::{
    ClassExecutor, ExecutionEnd, ExecutionOutcome, ExecutionRequest, ServiceRegistry, StopSignal,
    WorkerEnvironment, WorkerError,
};
use crate::protocol::OutputStream;
use crate::worker::InProcessLauncher;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;

pub const JUNIT_TEST: &str = "Lorg/junit/Test;";
pub const JUPITER_TEST: &str = "Lorg/junit/jupiter/api/Test;";
pub const TESTNG_TEST: &str = "Lorg/testng/annotations/Test;";

/// Creates a temp directory with a minimal testmux.toml.
pub fn temp_project() -> TempDir {
    temp_project_with_config("version = 1\n")
}

/// Creates a temp directory with custom config content.
pub fn temp_project_with_config(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("testmux.toml"), config).unwrap();
    dir
}

/// Creates a directory tree from a list of (path, content) pairs.
///
/// Parent directories are created automatically.
pub fn create_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }
}

/// Writes a class file under `root` at its package path.
pub fn write_class(root: &Path, class: &ClassBuilder) {
    let full_path = root.join(format!("{}.class", class.name));
    fs::create_dir_all(full_path.parent().unwrap()).unwrap();
    fs::write(full_path, class.build()).unwrap();
}

// =============================================================================
// Class files
// =============================================================================

/// Synthesizes minimal class files.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    super_name: Option<String>,
    access: u16,
    interfaces: Vec<String>,
    class_annotations: Vec<String>,
    method_annotations: Vec<String>,
}

impl ClassBuilder {
    /// A public class named by binary name (`com.acme.FooTest`).
    pub fn new(name: &str) -> Self {
        Self {
            name: name.replace('.', "/"),
            super_name: Some("java/lang/Object".to_string()),
            access: ACC_PUBLIC | ACC_SUPER,
            interfaces: Vec::new(),
            class_annotations: Vec::new(),
            method_annotations: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.super_name = Some(parent.replace('.', "/"));
        self
    }

    pub fn no_super(mut self) -> Self {
        self.super_name = None;
        self
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.access = flags;
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.replace('.', "/"));
        self
    }

    /// Class annotation (descriptor form) with a class-valued `value` element.
    pub fn annotated(mut self, descriptor: &str) -> Self {
        self.class_annotations.push(descriptor.to_string());
        self
    }

    /// A method carrying the given annotation.
    pub fn test_method(mut self, descriptor: &str) -> Self {
        self.method_annotations.push(descriptor.to_string());
        self
    }

    pub fn binary_name(&self) -> String {
        self.name.replace('/', ".")
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let this_class = pool.class(&self.name);
        let super_class = self.super_name.as_deref().map_or(0, |s| pool.class(s));
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        let annotations_attr = pool.utf8("RuntimeVisibleAnnotations");
        let method_name = pool.utf8("test");
        let method_descriptor = pool.utf8("()V");
        let value_name = pool.utf8("value");
        let value_class = pool.utf8("Lorg/junit/runners/JUnit4;");
        // A long constant exercises the two-slot rule.
        pool.long(42);

        let class_annotations: Vec<u16> =
            self.class_annotations.iter().map(|a| pool.utf8(a)).collect();
        let method_annotations: Vec<u16> =
            self.method_annotations.iter().map(|a| pool.utf8(a)).collect();

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        pool.write(&mut out);

        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this_class.to_be_bytes());
        out.extend_from_slice(&super_class.to_be_bytes());
        out.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
        for index in interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }

        // Fields.
        out.extend_from_slice(&0u16.to_be_bytes());

        // Methods.
        if method_annotations.is_empty() {
            out.extend_from_slice(&0u16.to_be_bytes());
        } else {
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&ACC_PUBLIC.to_be_bytes());
            out.extend_from_slice(&method_name.to_be_bytes());
            out.extend_from_slice(&method_descriptor.to_be_bytes());
            out.extend_from_slice(&1u16.to_be_bytes());
            write_annotations(&mut out, annotations_attr, &method_annotations, None);
        }

        // Class attributes.
        if class_annotations.is_empty() {
            out.extend_from_slice(&0u16.to_be_bytes());
        } else {
            out.extend_from_slice(&1u16.to_be_bytes());
            write_annotations(
                &mut out,
                annotations_attr,
                &class_annotations,
                Some((value_name, value_class)),
            );
        }
        out
    }

    /// The built class as a candidate at its conventional path.
    pub fn candidate(&self) -> CandidateClass {
        CandidateClass::new(format!("{}.class", self.name), self.build())
    }
}

fn write_annotations(out: &mut Vec<u8>, attr_name: u16, types: &[u16], element: Option<(u16, u16)>) {
    let mut body = Vec::new();
    body.extend_from_slice(&(types.len() as u16).to_be_bytes());
    for &type_index in types {
        body.extend_from_slice(&type_index.to_be_bytes());
        match element {
            Some((name, class_info)) => {
                body.extend_from_slice(&1u16.to_be_bytes());
                body.extend_from_slice(&name.to_be_bytes());
                body.push(b'c');
                body.extend_from_slice(&class_info.to_be_bytes());
            }
            None => body.extend_from_slice(&0u16.to_be_bytes()),
        }
    }
    out.extend_from_slice(&attr_name.to_be_bytes());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
}

#[derive(Default)]
struct PoolBuilder {
    bytes: Vec<u8>,
    next: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl PoolBuilder {
    fn slot(&mut self, width: u16) -> u16 {
        if self.next == 0 {
            self.next = 1;
        }
        let index = self.next;
        self.next += width;
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8.get(value) {
            return index;
        }
        let index = self.slot(1);
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        if let Some(&index) = self.classes.get(internal_name) {
            return index;
        }
        let name_index = self.utf8(internal_name);
        let index = self.slot(1);
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.classes.insert(internal_name.to_string(), index);
        index
    }

    fn long(&mut self, value: i64) -> u16 {
        let index = self.slot(2);
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        index
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.next.max(1).to_be_bytes());
        out.extend_from_slice(&self.bytes);
    }
}

/// A JUnit 4 test class candidate.
pub fn junit_test(name: &str) -> CandidateClass {
    ClassBuilder::new(name).test_method(JUNIT_TEST).candidate()
}

/// A class no framework treats as a test.
pub fn plain_class(name: &str) -> CandidateClass {
    ClassBuilder::new(name).candidate()
}

// =============================================================================
// Execution
// =============================================================================

/// What the scripted executor does for one class invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Exit with this code after printing one line.
    Exit(i32),
    /// Fail the executor itself; the worker dies.
    Crash,
    /// Block until stopped or timed out.
    Hang,
    /// Block this long, then exit 0.
    Sleep(Duration),
}

impl Step {
    pub const PASS: Step = Step::Exit(0);
    pub const FAIL: Step = Step::Exit(1);
}

/// Executor replaying per-class scripts; classes without a script pass.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Steps for successive invocations of `class`.
    pub fn script(&self, class: &str, steps: &[Step]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(class.to_string(), steps.iter().copied().collect());
    }

    /// Class names in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, class: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == class).count()
    }

    fn next_step(&self, class: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(class)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::PASS)
    }
}

impl ClassExecutor for ScriptedExecutor {
    fn execute(
        &self,
        request: &ExecutionRequest,
        stop: &StopSignal,
        output: &mut dyn FnMut(OutputStream, String),
    ) -> Result<ExecutionOutcome, WorkerError> {
        self.calls.lock().unwrap().push(request.class.clone());
        let started = Instant::now();
        let step = self.next_step(&request.class);

        let wait_until = |limit: Option<Duration>| -> ExecutionEnd {
            loop {
                if stop.is_requested() {
                    return ExecutionEnd::Cancelled;
                }
                if request.timeout.is_some_and(|t| started.elapsed() >= t) {
                    return ExecutionEnd::TimedOut;
                }
                if limit.is_some_and(|l| started.elapsed() >= l) {
                    return ExecutionEnd::Exited;
                }
                std::thread::sleep(Duration::from_millis(2));
            }
        };

        let (exit_code, end) = match step {
            Step::Exit(code) => {
                output(OutputStream::Stdout, format!("running {}", request.class));
                (Some(code), ExecutionEnd::Exited)
            }
            Step::Crash => {
                return Err(WorkerError::Executor {
                    class: request.class.clone(),
                    message: "scripted crash".to_string(),
                });
            }
            Step::Hang => (None, wait_until(None)),
            Step::Sleep(duration) => {
                let end = wait_until(Some(duration));
                (Some(0), end)
            }
        };
        Ok(ExecutionOutcome {
            exit_code,
            duration: started.elapsed(),
            end,
        })
    }
}

/// In-process launcher whose workers all use `executor`.
pub fn scripted_launcher(executor: Arc<ScriptedExecutor>) -> InProcessLauncher {
    InProcessLauncher::new(move |spec| {
        ServiceRegistry::new(WorkerEnvironment::from_launch_spec(spec)).with_executor(executor.clone())
    })
}

/// Descriptor for a framework with default configuration.
pub fn descriptor(kind: FrameworkKind, name: &str) -> FrameworkDescriptor {
    let mut config = FrameworkConfig::new(kind);
    config.name = Some(name.to_string());
    FrameworkDescriptor::from_config(&config, None).unwrap()
}
