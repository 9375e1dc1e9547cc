// src/core/test_support.rs
//
// Shared mock collaborators for the engine's unit tests. A `TestHost` owns
// one of everything `InvocationContext` needs and hands out borrows.

use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::INVOCATION_DISCRIMINANT;
use crate::context::{
    CommandExecutor, ConfigurationSource, InvocationContext, PersistentMemory, PickRequest,
    Picker, ProcessOutput, ProcessRequest, ProcessRunner, Reporter, TextPrompt, WorkspaceContext,
};
use crate::models::{InputRecord, RecordIdentity, ScopeRecords, WorkspaceFolder};
use crate::system::executor::ExecutionError;
use crate::system::memory::SessionStore;

/// Builds a raw invocation record the way a configuration file declares it.
pub fn record(id: &str, args: Value) -> Value {
    json!({
        "id": id,
        "type": "command",
        "command": INVOCATION_DISCRIMINANT,
        "args": args,
    })
}

#[derive(Default)]
pub struct RecordingReporter {
    messages: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Reporter for RecordingReporter {
    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[derive(Default)]
pub struct StaticConfig {
    pub scopes: Vec<ScopeRecords>,
}

impl ConfigurationSource for StaticConfig {
    fn scopes(&self) -> Vec<ScopeRecords> {
        self.scopes.clone()
    }
}

#[derive(Default)]
pub struct MockRunner {
    requests: RefCell<Vec<ProcessRequest>>,
    output: ProcessOutput,
    fail: bool,
}

impl MockRunner {
    pub fn invocations(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<ProcessRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl ProcessRunner for MockRunner {
    fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput, ExecutionError> {
        if self.fail {
            return Err(ExecutionError::NonZeroExit {
                command: request.command.clone(),
                detail: "exit status 1".to_string(),
            });
        }
        self.requests.borrow_mut().push(request.clone());
        Ok(self.output.clone())
    }
}

enum PickBehavior {
    First,
    Select(Vec<String>),
    Cancel,
}

pub struct MockPicker {
    behavior: PickBehavior,
    requests: RefCell<Vec<PickRequest>>,
}

impl Default for MockPicker {
    fn default() -> Self {
        Self {
            behavior: PickBehavior::First,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl MockPicker {
    pub fn invocations(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<PickRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl Picker for MockPicker {
    fn pick(&self, request: &PickRequest) -> anyhow::Result<Option<Vec<String>>> {
        self.requests.borrow_mut().push(request.clone());
        Ok(match &self.behavior {
            PickBehavior::First => request
                .items
                .first()
                .map(|item| vec![item.value.clone()]),
            PickBehavior::Select(values) => Some(values.clone()),
            PickBehavior::Cancel => None,
        })
    }
}

#[derive(Default)]
pub struct MockPrompt {
    answer: Option<String>,
    last_initial: RefCell<String>,
}

impl MockPrompt {
    pub fn last_initial(&self) -> String {
        self.last_initial.borrow().clone()
    }
}

impl TextPrompt for MockPrompt {
    fn prompt(&self, _text: &str, initial: &str) -> anyhow::Result<Option<String>> {
        *self.last_initial.borrow_mut() = initial.to_string();
        Ok(self.answer.clone())
    }
}

#[derive(Default)]
pub struct MockCommands {
    commands: HashMap<String, Value>,
}

impl CommandExecutor for MockCommands {
    fn execute(&self, name: &str) -> anyhow::Result<Value> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown command '{name}'"))
    }
}

#[derive(Default)]
pub struct MemoryState {
    entries: RefCell<HashMap<String, Value>>,
}

impl MemoryState {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}

impl PersistentMemory for MemoryState {
    fn get(&self, key: &str) -> Option<Value> {
        Self::get(self, key)
    }

    fn set(&self, key: &str, value: Value) {
        Self::set(self, key, value);
    }
}

pub struct TestHost {
    pub config: StaticConfig,
    pub runner: MockRunner,
    pub picker: MockPicker,
    pub prompter: MockPrompt,
    pub commands: MockCommands,
    pub session: SessionStore,
    pub persistent: MemoryState,
    pub reporter: RecordingReporter,
    pub workspace: WorkspaceContext,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    pub fn new() -> Self {
        let workspace = WorkspaceContext {
            folders: vec![WorkspaceFolder {
                name: "app".to_string(),
                path: PathBuf::from("/work/app"),
            }],
            ..Default::default()
        };
        Self {
            config: StaticConfig {
                scopes: vec![ScopeRecords {
                    workspace_index: Some(0),
                    ..Default::default()
                }],
            },
            runner: MockRunner::default(),
            picker: MockPicker::default(),
            prompter: MockPrompt::default(),
            commands: MockCommands::default(),
            session: SessionStore::default(),
            persistent: MemoryState::default(),
            reporter: RecordingReporter::default(),
            workspace,
        }
    }

    pub fn with_inputs(inputs: Vec<Value>) -> Self {
        let mut host = Self::new();
        if let Some(scope) = host.config.scopes.first_mut() {
            scope.inputs = inputs;
        }
        host
    }

    pub fn with_process_env(mut self, name: &str, value: &str) -> Self {
        self.workspace.env.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_active_file(mut self, path: &str, line: u32) -> Self {
        self.workspace.active_file = Some(PathBuf::from(path));
        self.workspace.line_number = Some(line);
        self.workspace.active_folder = Some(0);
        self
    }

    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.workspace.merged_settings.insert(key.to_string(), value);
        self
    }

    pub fn with_command(mut self, name: &str, result: Value) -> Self {
        self.commands.commands.insert(name.to_string(), result);
        self
    }

    pub fn with_prompt_answer(mut self, answer: &str) -> Self {
        self.prompter.answer = Some(answer.to_string());
        self
    }

    pub fn with_picker_selection(mut self, values: &[&str]) -> Self {
        self.picker.behavior =
            PickBehavior::Select(values.iter().map(|v| (*v).to_string()).collect());
        self
    }

    pub fn with_picker_cancelled(mut self) -> Self {
        self.picker.behavior = PickBehavior::Cancel;
        self
    }

    pub fn with_runner_output(mut self, stdout: &str, stderr: &str) -> Self {
        self.runner.output = ProcessOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        self
    }

    pub fn with_runner_failure(mut self) -> Self {
        self.runner.fail = true;
        self
    }

    pub fn context(&self) -> InvocationContext<'_> {
        InvocationContext {
            config: &self.config,
            runner: &self.runner,
            picker: &self.picker,
            prompter: &self.prompter,
            commands: &self.commands,
            session: &self.session,
            persistent: &self.persistent,
            reporter: &self.reporter,
            workspace: &self.workspace,
        }
    }

    pub fn input_record(&self) -> InputRecord {
        InputRecord {
            id: "test-input".to_string(),
            workspace_index: 0,
            env: HashMap::new(),
            identity: RecordIdentity::default(),
        }
    }
}
