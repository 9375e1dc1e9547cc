// src/system/executor.rs

use std::io::Write;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

use crate::context::{ProcessOutput, ProcessRequest, ProcessRunner};

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command '{command}' could not be executed: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write stdin of '{command}': {source}")]
    Stdin {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command '{command}' failed: {detail}")]
    NonZeroExit { command: String, detail: String },
    #[error("Command '{command}' produced more than {limit} bytes of output.")]
    BufferExceeded { command: String, limit: u64 },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Spawns the configured process and captures its output to completion.
///
/// Two modes, chosen by the request: with an argv tail the program is
/// spawned directly and no shell re-parses anything; without one the whole
/// command line is handed to the platform shell, which owns all quoting
/// and globbing semantics.
#[derive(Debug, Default)]
pub struct StdProcessRunner;

impl ProcessRunner for StdProcessRunner {
    fn run(&self, request: &ProcessRequest) -> Result<ProcessOutput, ExecutionError> {
        let mut command = match &request.args {
            Some(args) => {
                let mut command = StdCommand::new(&request.command);
                command.args(args);
                command
            }
            None => shell_command(&request.command),
        };

        command
            .current_dir(dunce::simplified(&request.cwd))
            .env_clear()
            .envs(&request.env)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
            command: request.command.clone(),
            source,
        })?;

        if let Some(stdin) = &request.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(stdin.as_bytes())
                    .map_err(|source| ExecutionError::Stdin {
                        command: request.command.clone(),
                        source,
                    })?;
                // Dropping the pipe closes it so the child sees EOF.
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| ExecutionError::Spawn {
                command: request.command.clone(),
                source,
            })?;

        if let Some(limit) = request.max_buffer {
            if output.stdout.len() as u64 > limit || output.stderr.len() as u64 > limit {
                return Err(ExecutionError::BufferExceeded {
                    command: request.command.clone(),
                    limit,
                });
            }
        }

        let stdout = decode(&request.command, output.stdout)?;
        let stderr = decode(&request.command, output.stderr)?;

        if !output.status.success() {
            let mut detail = output.status.to_string();
            let trimmed = stderr.trim();
            if !trimmed.is_empty() {
                detail.push_str(": ");
                detail.push_str(trimmed);
            }
            return Err(ExecutionError::NonZeroExit {
                command: request.command.clone(),
                detail,
            });
        }

        Ok(ProcessOutput { stdout, stderr })
    }
}

fn shell_command(command_line: &str) -> StdCommand {
    if cfg!(target_os = "windows") {
        let mut command = StdCommand::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = StdCommand::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

fn decode(command: &str, bytes: Vec<u8>) -> Result<String, ExecutionError> {
    String::from_utf8(bytes).map_err(|source| ExecutionError::InvalidUtf8Output {
        command: command.to_string(),
        source,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn request(command: &str) -> ProcessRequest {
        ProcessRequest {
            command: command.to_string(),
            args: None,
            cwd: PathBuf::from("."),
            env: HashMap::from([("PATH".to_string(), "/usr/bin:/bin".to_string())]),
            stdin: None,
            max_buffer: None,
        }
    }

    #[test]
    fn shell_mode_captures_stdout() {
        let output = StdProcessRunner.run(&request("printf 'a\\nb\\n'")).unwrap();
        assert_eq!(output.stdout, "a\nb\n");
        assert_eq!(output.stderr, "");
    }

    #[test]
    fn argv_mode_skips_the_shell() {
        let mut req = request("printf");
        // A shell would expand this; argv mode must not.
        req.args = Some(vec!["%s".to_string(), "$HOME".to_string()]);
        let output = StdProcessRunner.run(&req).unwrap();
        assert_eq!(output.stdout, "$HOME");
    }

    #[test]
    fn stdin_is_piped() {
        let mut req = request("cat -");
        req.stdin = Some("piped text".to_string());
        let output = StdProcessRunner.run(&req).unwrap();
        assert_eq!(output.stdout, "piped text");
    }

    #[test]
    fn env_is_exactly_the_requested_map() {
        let mut req = request("printf '%s' \"$MARKER\"");
        req.env.insert("MARKER".to_string(), "present".to_string());
        let output = StdProcessRunner.run(&req).unwrap();
        assert_eq!(output.stdout, "present");
    }

    #[test]
    fn non_zero_exit_is_fatal_with_stderr() {
        let err = StdProcessRunner
            .run(&request("echo oops >&2; exit 3"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("oops"), "unexpected: {message}");
    }

    #[test]
    fn max_buffer_bounds_captured_output() {
        let mut req = request("printf '0123456789'");
        req.max_buffer = Some(4);
        let err = StdProcessRunner.run(&req).unwrap_err();
        assert!(matches!(err, ExecutionError::BufferExceeded { limit: 4, .. }));
    }
}
