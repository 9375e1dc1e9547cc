// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::DEFAULT_MULTISELECT_SEPARATOR;

/// Which output stream(s) of the spawned process feed the candidate list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StdioPolicy {
    #[default]
    Stdout,
    Stderr,
    Both,
}

impl StdioPolicy {
    /// Parses the loose `stdio` option. Anything unrecognized falls back
    /// to `stdout`, mirroring the permissive option-bag contract.
    pub fn from_option(raw: Option<&str>) -> Self {
        match raw {
            Some("stderr") => Self::Stderr,
            Some("both") => Self::Both,
            _ => Self::Stdout,
        }
    }

    pub fn includes_stdout(self) -> bool {
        matches!(self, Self::Stdout | Self::Both)
    }

    pub fn includes_stderr(self) -> bool {
        matches!(self, Self::Stderr | Self::Both)
    }
}

/// Fully validated and defaulted per-invocation configuration.
///
/// This is the strict counterpart of the loose JSON option bag a record
/// declares: every recognized option is enumerated here, already coerced.
/// Loosely-typed values never travel deeper into the engine than
/// `core::options`, which builds this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOptions {
    /// Normalized command line (sequence form is joined with single spaces).
    pub command: String,
    /// When present, the process is spawned directly with this argv tail
    /// instead of handing `command` to a shell.
    pub command_args: Option<Vec<String>>,
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub stdin: Option<String>,
    pub stdin_resolve_vars: bool,
    pub field_separator: Option<String>,
    /// Shown as the picker placeholder.
    pub description: Option<String>,
    /// Cap on captured output, in bytes.
    pub max_buffer: Option<u64>,
    pub task_id: Option<String>,
    pub remember_as: Option<String>,
    pub remember_previous: bool,
    pub use_first_result: bool,
    pub use_single_result: bool,
    pub allow_custom_values: bool,
    pub multiselect: bool,
    pub multiselect_separator: String,
    pub warn_on_stderr: bool,
    pub filter_empty_results: bool,
    pub stdio: StdioPolicy,
    /// Fallback candidates used when the command yields none.
    pub default_options: Option<Vec<String>>,
}

impl InvocationOptions {
    /// The key under which a completed selection is remembered.
    pub fn remember_key(&self) -> Option<&str> {
        self.remember_as.as_deref().or(self.task_id.as_deref())
    }
}

impl Default for InvocationOptions {
    fn default() -> Self {
        Self {
            command: String::new(),
            command_args: None,
            cwd: None,
            env: None,
            stdin: None,
            stdin_resolve_vars: true,
            field_separator: None,
            description: None,
            max_buffer: None,
            task_id: None,
            remember_as: None,
            remember_previous: false,
            use_first_result: false,
            use_single_result: false,
            allow_custom_values: false,
            multiselect: false,
            multiselect_separator: DEFAULT_MULTISELECT_SEPARATOR.to_string(),
            warn_on_stderr: true,
            filter_empty_results: true,
            stdio: StdioPolicy::Stdout,
            default_options: None,
        }
    }
}

/// Identity fields extracted from a declared invocation record, used to
/// match a live invocation against its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordIdentity {
    pub task_id: Option<String>,
    /// Normalized command (sequence form already joined).
    pub command: String,
    pub command_args: Option<Vec<String>>,
    pub stdin: Option<String>,
}

/// One declared invocation record, as enumerated from a configuration scope.
///
/// Records are read fresh on every invocation and never mutated; the engine
/// only uses them for matching and for the declaring scope's default env.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub id: String,
    /// Index of the workspace folder whose scope declared this record.
    /// Global scopes report 0.
    pub workspace_index: usize,
    /// Default environment configured by the declaring scope.
    pub env: HashMap<String, String>,
    pub identity: RecordIdentity,
}

/// One selectable option parsed from process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub value: String,
    pub label: String,
    pub description: Option<String>,
    pub detail: Option<String>,
}

impl CandidateItem {
    /// Builds a single-field candidate, as used for `defaultOptions`.
    pub fn plain(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: value.to_string(),
            description: None,
            detail: None,
        }
    }
}

/// The records and default environment of one configuration scope.
/// Scopes are enumerated in priority order: folder-local first, then
/// workspace-global, then user-global. Later matches win.
#[derive(Debug, Clone, Default)]
pub struct ScopeRecords {
    /// Workspace folder this scope belongs to, when folder-local.
    pub workspace_index: Option<usize>,
    /// Raw declared records. Heterogeneous: third-party records may embed
    /// a shellpick invocation anywhere inside them.
    pub inputs: Vec<serde_json::Value>,
    /// Scope-level default environment applied to every record it declares.
    pub env: HashMap<String, String>,
}

/// One folder of the active workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}
