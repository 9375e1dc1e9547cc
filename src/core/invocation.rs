// src/core/invocation.rs
//
// The orchestrator: validates the option bag, matches it to its declared
// record, expands variables, runs the process exactly once, parses and
// selects, and records the outcome for sibling invocations.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::context::{InvocationContext, ProcessRequest};
use crate::core::errors::{InvocationError, InvocationResult};
use crate::core::interpolator::{VariableExpander, input_session_key, task_session_key};
use crate::core::options::resolve_options;
use crate::core::registry::resolve_record;
use crate::core::result_parser::parse_candidates;
use crate::core::selection;
use crate::models::{InputRecord, InvocationOptions, RecordIdentity};

/// The engine's single operation: execute one invocation described by a
/// raw option bag.
///
/// Returns the joined selection, or `None` when the user cancelled.
/// Every fatal condition surfaces as a structured `InvocationError`.
pub fn execute_invocation(
    args: &Value,
    ctx: &InvocationContext<'_>,
) -> InvocationResult<Option<String>> {
    CommandInvocation::new(args, ctx)?.execute()
}

pub struct CommandInvocation<'a> {
    ctx: &'a InvocationContext<'a>,
    options: InvocationOptions,
    input: InputRecord,
}

impl<'a> CommandInvocation<'a> {
    /// Validates the option bag and resolves the declaring record.
    /// Matching uses the raw, unexpanded command: declarations are compared
    /// as written, not as executed.
    pub fn new(args: &Value, ctx: &'a InvocationContext<'a>) -> InvocationResult<Self> {
        let options = resolve_options(args, ctx.reporter)?;

        if options.remember_previous && options.remember_key().is_none() {
            return Err(InvocationError::validation(
                "You need to specify 'taskId' or 'rememberAs' when using rememberPrevious=true",
            ));
        }

        let query = RecordIdentity {
            task_id: options.task_id.clone(),
            command: options.command.clone(),
            command_args: options.command_args.clone(),
            stdin: options.stdin.clone(),
        };
        let input = resolve_record(&query, ctx)?;

        Ok(Self {
            ctx,
            options,
            input,
        })
    }

    pub fn execute(self) -> InvocationResult<Option<String>> {
        let remembered = selection::remembered_defaults(self.ctx, &self.options);

        let request = self.expand(&remembered)?;
        let output = self.ctx.runner.run(&request)?;

        let candidates = parse_candidates(&output, &self.options, &self.input.id, self.ctx.reporter)?;
        let selected = selection::select(self.ctx, &candidates, &self.options, &remembered)?;

        let values = match selected {
            Some(values) => values,
            None => {
                // Cancelled: clear anything a sibling lookup could mistake
                // for a completed value.
                self.ctx.session.remove(&input_session_key(&self.input.id));
                if let Some(key) = self.options.remember_key() {
                    self.ctx.session.remove(&task_session_key(key));
                }
                return Ok(None);
            }
        };

        if self.options.remember_previous {
            if let Some(key) = self.options.remember_key() {
                selection::remember_selection(self.ctx, key, &values);
            }
        }

        let result = values.join(&self.options.multiselect_separator);
        self.record(&result);
        Ok(Some(result))
    }

    /// Expands variables in command, commandArgs, stdin, env, and cwd.
    /// Any failure aborts before anything is executed.
    fn expand(&self, remembered: &[String]) -> InvocationResult<ProcessRequest> {
        let remembered_value = remembered.join(&self.options.multiselect_separator);
        let declared_env = self.options.env.clone();
        let expander = VariableExpander::new(
            self.ctx,
            &self.input,
            declared_env.as_ref(),
            remembered_value,
        );

        let command = expander.resolve(&self.options.command)?;
        if command.is_empty() {
            return Err(InvocationError::validation(
                "Your command is badly formatted and variables could not be resolved",
            ));
        }

        let stdin = match &self.options.stdin {
            Some(template) if self.options.stdin_resolve_vars => {
                let resolved = expander.resolve(template)?;
                if resolved.is_empty() {
                    return Err(InvocationError::validation(
                        "Your stdin is badly formatted and variables could not be resolved. \
                         Set stdinResolveVars=false to prevent stdin vars resolving",
                    ));
                }
                Some(resolved)
            }
            other => other.clone(),
        };

        let args = match &self.options.command_args {
            Some(elements) => {
                let mut resolved = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let item = expander.resolve(element)?;
                    if item.is_empty() && !element.is_empty() {
                        return Err(InvocationError::validation(format!(
                            "\"commandArgs\" element at index {index} is invalid."
                        )));
                    }
                    resolved.push(item);
                }
                Some(resolved)
            }
            None => None,
        };

        // Declared env merges over the declaring scope's defaults, which
        // merge over the inherited process environment.
        let mut env: HashMap<String, String> = self.ctx.workspace.env.clone();
        env.extend(self.input.env.clone());
        if let Some(declared) = &declared_env {
            for (name, template) in declared {
                env.insert(name.clone(), expander.resolve(template)?);
            }
        }

        let cwd = self.resolve_cwd(&expander)?;

        Ok(ProcessRequest {
            command,
            args,
            cwd,
            env,
            stdin,
            max_buffer: self.options.max_buffer,
        })
    }

    fn resolve_cwd(&self, expander: &VariableExpander<'_>) -> InvocationResult<PathBuf> {
        if let Some(template) = &self.options.cwd {
            let resolved = expander.resolve(template)?;
            if !resolved.is_empty() {
                return Ok(PathBuf::from(shellexpand::tilde(&resolved).into_owned()));
            }
        }
        // Default: the declaring workspace folder.
        if let Some(folder) = self
            .ctx
            .workspace
            .folder_by_index(self.input.workspace_index)
            .or_else(|| self.ctx.workspace.folders.first())
        {
            return Ok(folder.path.clone());
        }
        Ok(PathBuf::from("."))
    }

    /// Records the result so sibling `input:`/`taskId:` lookups within
    /// this session see it.
    fn record(&self, result: &str) {
        self.ctx
            .session
            .set(&input_session_key(&self.input.id), result);
        if let Some(key) = self.options.remember_key() {
            self.ctx.session.set(&task_session_key(key), result);
        }
    }
}
