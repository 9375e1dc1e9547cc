// src/core/errors.rs

use thiserror::Error;

use crate::system::executor::ExecutionError;

/// A variable expression that could not be resolved. Always names the
/// offending `${...}` expression so the user can find it in their record.
#[derive(Error, Debug)]
#[error("Could not resolve '${{{expression}}}': {reason}")]
pub struct ExpansionError {
    pub expression: String,
    pub reason: String,
}

impl ExpansionError {
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

/// Fatal failures of one invocation. Warnings are not errors; they flow
/// through the `Reporter` collaborator instead. Picker dismissal is not an
/// error either: the engine returns `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("{0}")]
    Validation(String),
    #[error("Could not find input with command '{command}' and taskId '{task_id}'.")]
    InputNotFound { command: String, task_id: String },
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("The command for input '{input_id}' didn't output any results.{stderr_note}")]
    EmptyResult {
        input_id: String,
        stderr_note: String,
    },
    #[error("{collaborator} collaborator failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },
}

impl InvocationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn empty_result(input_id: &str, stderr: &str) -> Self {
        let stderr_note = if stderr.is_empty() {
            String::new()
        } else {
            format!(" stderr: '{stderr}'")
        };
        Self::EmptyResult {
            input_id: input_id.to_string(),
            stderr_note,
        }
    }

    pub fn collaborator(collaborator: &'static str, source: anyhow::Error) -> Self {
        Self::Collaborator {
            collaborator,
            message: format!("{source:#}"),
        }
    }
}

pub type InvocationResult<T> = Result<T, InvocationError>;
