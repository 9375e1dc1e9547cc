// src/system/config_loader.rs
//
// File-backed configuration source for the CLI. Each scope file (TOML or
// JSON) contributes one configuration scope: its invocation records, its
// default environment, and its named `command:` collaborator commands.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::constants::INVOCATION_DISCRIMINANT;
use crate::context::{CommandExecutor, ConfigurationSource, ProcessRequest, ProcessRunner};
use crate::models::ScopeRecords;
use crate::system::executor::StdProcessRunner;

#[derive(Deserialize, Debug, Default)]
struct ScopeFile {
    /// Workspace folder index this scope belongs to. Absent for global scopes.
    workspace: Option<usize>,
    #[serde(default)]
    inputs: Vec<Value>,
    #[serde(default)]
    env: HashMap<String, String>,
    /// Named shell commands backing the `${command:NAME}` namespace.
    #[serde(default)]
    commands: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct FileConfigurationSource {
    scopes: Vec<ScopeRecords>,
    commands: HashMap<String, String>,
}

impl FileConfigurationSource {
    /// Loads scope files in the given order. Order is priority: records
    /// from later files override earlier ones when both match.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut source = Self::default();
        for path in paths {
            let scope = read_scope_file(path)
                .with_context(|| format!("Failed to load scope file '{}'", path.display()))?;
            source.scopes.push(ScopeRecords {
                workspace_index: scope.workspace,
                inputs: scope.inputs,
                env: scope.env,
            });
            source.commands.extend(scope.commands);
        }
        Ok(source)
    }

    /// Finds the raw args of a declared record by its `id` or `taskId`,
    /// searching nested third-party records too. Later scopes win.
    pub fn find_args(&self, selector: &str) -> Option<Value> {
        let mut result = None;
        for scope in &self.scopes {
            for input in &scope.inputs {
                find_args_in(input, selector, &mut result);
            }
        }
        result
    }

    pub fn commands(&self) -> &HashMap<String, String> {
        &self.commands
    }
}

impl ConfigurationSource for FileConfigurationSource {
    fn scopes(&self) -> Vec<ScopeRecords> {
        self.scopes.clone()
    }
}

fn read_scope_file(path: &Path) -> Result<ScopeFile> {
    let raw = std::fs::read_to_string(path)?;
    if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
        Ok(toml::from_str(&raw)?)
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}

fn find_args_in(value: &Value, selector: &str, result: &mut Option<Value>) {
    if let Value::Object(fields) = value {
        let ours = fields.get("command").and_then(Value::as_str) == Some(INVOCATION_DISCRIMINANT);
        if ours {
            let by_id = fields.get("id").and_then(Value::as_str) == Some(selector);
            let by_task_id = fields
                .get("args")
                .and_then(|args| args.get("taskId"))
                .and_then(Value::as_str)
                == Some(selector);
            if by_id || by_task_id {
                *result = fields.get("args").cloned();
            }
        }
        for child in fields.values() {
            find_args_in(child, selector, result);
        }
    } else if let Value::Array(items) = value {
        for child in items {
            find_args_in(child, selector, result);
        }
    }
}

/// Runs a scope-declared named command through the shell and hands its
/// trimmed stdout to the `${command:NAME}` namespace.
pub struct NamedCommandExecutor {
    commands: HashMap<String, String>,
    cwd: PathBuf,
    env: HashMap<String, String>,
}

impl NamedCommandExecutor {
    pub fn new(commands: HashMap<String, String>, cwd: PathBuf, env: HashMap<String, String>) -> Self {
        Self {
            commands,
            cwd,
            env,
        }
    }
}

impl CommandExecutor for NamedCommandExecutor {
    fn execute(&self, name: &str) -> Result<Value> {
        let command_line = self
            .commands
            .get(name)
            .with_context(|| format!("no declared command named '{name}'"))?;
        log::debug!("Executing '{command_line}' for substitution.");
        let output = StdProcessRunner
            .run(&ProcessRequest {
                command: command_line.clone(),
                args: None,
                cwd: self.cwd.clone(),
                env: self.env.clone(),
                stdin: None,
                max_buffer: None,
            })
            .with_context(|| format!("execution of '{name}' for substitution failed"))?;
        Ok(Value::String(output.stdout.trim().to_string()))
    }
}
