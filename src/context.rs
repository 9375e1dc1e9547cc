// src/context.rs
//
// Collaborator seams and the explicit ambient context.
//
// The engine never reaches for globals: everything the host environment
// provides (configuration scopes, process spawning, the picker UI, session
// and persistent memory, the active editor state) is threaded through an
// `InvocationContext`, so call sites under test can substitute any part.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::{ScopeRecords, WorkspaceFolder};
use crate::system::executor::ExecutionError;

/// A request to spawn the configured process exactly once.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Full command line (shell mode) or program path (argv mode).
    pub command: String,
    /// When present, the process is spawned directly with these arguments
    /// and no shell re-parses the command line.
    pub args: Option<Vec<String>>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub stdin: Option<String>,
    /// Cap on captured output, in bytes. Exceeding it is fatal.
    pub max_buffer: Option<u64>,
}

/// Captured output of a completed process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// What the interactive picker is asked to show.
#[derive(Debug, Clone)]
pub struct PickRequest {
    pub items: Vec<PickItem>,
    pub multiselect: bool,
    pub allow_custom: bool,
    pub placeholder: Option<String>,
    /// Values to pre-activate (single-select) or pre-check (multiselect).
    pub preselected: Vec<String>,
}

/// One row presented by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub value: String,
    pub label: String,
    pub description: Option<String>,
    pub detail: Option<String>,
}

/// Enumerates declared invocation records, one `ScopeRecords` per
/// configuration scope, in priority order (folder-local scopes first,
/// then workspace-global, then user-global).
pub trait ConfigurationSource {
    fn scopes(&self) -> Vec<ScopeRecords>;
}

/// Runs a program to completion and captures its output.
pub trait ProcessRunner {
    fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput, ExecutionError>;
}

/// Interactive list selection. `Ok(None)` means the user dismissed the
/// picker without selecting anything; that is a cancellation, not an error.
pub trait Picker {
    fn pick(&self, request: &PickRequest) -> anyhow::Result<Option<Vec<String>>>;
}

/// Interactive free-text input for the `${prompt}` namespace.
/// `Ok(None)` means the prompt was dismissed.
pub trait TextPrompt {
    fn prompt(&self, text: &str, initial: &str) -> anyhow::Result<Option<String>>;
}

/// Named host command execution for the `${command:NAME}` namespace.
/// The returned value must be a JSON string; the expander rejects others.
pub trait CommandExecutor {
    fn execute(&self, name: &str) -> anyhow::Result<serde_json::Value>;
}

/// Ephemeral, process-lifetime key/value store. Keys are namespaced by the
/// engine; entries are independent, so no cross-invocation locking is needed.
pub trait SessionMemory {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Key/value store that survives restarts, scoped to the workspace.
/// Values are JSON so older single-string entries stay readable next to
/// newer list-shaped ones.
pub trait PersistentMemory {
    fn get(&self, key: &str) -> Option<serde_json::Value>;
    fn set(&self, key: &str, value: serde_json::Value);
}

/// Sink for non-fatal, user-visible warnings.
pub trait Reporter {
    fn warn(&self, message: &str);
}

/// Snapshot of the host editor/workspace state consulted by variable
/// expansion. Every field is optional; missing state expands to the empty
/// string except for the few namespaces that demand a resolvable target.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceContext {
    pub folders: Vec<WorkspaceFolder>,
    /// Index into `folders` of the folder owning the active document.
    pub active_folder: Option<usize>,
    pub active_file: Option<PathBuf>,
    /// 1-based cursor line of the active editor.
    pub line_number: Option<u32>,
    /// Merged workspace+global settings, consulted first by `config:`.
    pub merged_settings: HashMap<String, serde_json::Value>,
    /// Per-folder settings, parallel to `folders`.
    pub folder_settings: HashMap<usize, HashMap<String, serde_json::Value>>,
    /// Inherited process environment.
    pub env: HashMap<String, String>,
}

impl WorkspaceContext {
    pub fn folder_by_index(&self, index: usize) -> Option<&WorkspaceFolder> {
        self.folders.get(index)
    }

    pub fn folder_by_name(&self, name: &str) -> Option<&WorkspaceFolder> {
        self.folders.iter().find(|folder| folder.name == name)
    }

    /// Resolves a `config:KEY` lookup: merged settings, then the active
    /// document's folder, then every folder in order. First non-empty wins.
    pub fn config_value(&self, key: &str) -> Option<&serde_json::Value> {
        if let Some(value) = non_empty(self.merged_settings.get(key)) {
            return Some(value);
        }
        if let Some(active) = self.active_folder {
            if let Some(settings) = self.folder_settings.get(&active) {
                if let Some(value) = non_empty(settings.get(key)) {
                    return Some(value);
                }
            }
        }
        for index in 0..self.folders.len() {
            if let Some(settings) = self.folder_settings.get(&index) {
                if let Some(value) = non_empty(settings.get(key)) {
                    return Some(value);
                }
            }
        }
        None
    }
}

fn non_empty(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    match value {
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other),
    }
}

/// Everything one invocation needs from its host, bundled so the engine's
/// layers share a single borrow instead of growing parameter lists.
pub struct InvocationContext<'a> {
    pub config: &'a dyn ConfigurationSource,
    pub runner: &'a dyn ProcessRunner,
    pub picker: &'a dyn Picker,
    pub prompter: &'a dyn TextPrompt,
    pub commands: &'a dyn CommandExecutor,
    pub session: &'a dyn SessionMemory,
    pub persistent: &'a dyn PersistentMemory,
    pub reporter: &'a dyn Reporter,
    pub workspace: &'a WorkspaceContext,
}
