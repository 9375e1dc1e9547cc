// src/core/interpolator.rs
//
// Expands `${...}` expressions against the variable namespaces. Expansion
// is two-phase: a synchronous pass substitutes everything it can and
// records a job for each expression that needs a collaborator round-trip
// (`command:`, `prompt`); a second pass resolves those jobs and splices the
// values back in descending offset order, so earlier splices never shift
// an unprocessed offset.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::constants::PROMPT_VALUE_PREFIX;
use crate::context::InvocationContext;
use crate::core::errors::ExpansionError;
use crate::core::options::parse_boolean;
use crate::models::InputRecord;

lazy_static! {
    // A run of dollars followed by one brace-delimited expression.
    static ref EXPRESSION: Regex = Regex::new(r"(\$+)\{([^}]*)\}").unwrap();
    static ref INDEXED_FOLDER: Regex = Regex::new(r"^workspaceFolder\[(\d+)\]$").unwrap();
}

/// Session-memory key for a value recorded under an input id.
/// Ids are truncated at their last `.` so sibling launch/task entries
/// (`pickEnv.dev`, `pickEnv.prod`) share one slot.
pub fn input_session_key(input_id: &str) -> String {
    let truncated = match input_id.rfind('.') {
        Some(i) => &input_id[..i],
        None => input_id,
    };
    format!("input/{truncated}")
}

/// Session-memory key for a value recorded under a taskId/rememberAs key.
pub fn task_session_key(task_id: &str) -> String {
    format!("taskId/{task_id}")
}

/// One deferred `${...}` match: where its value goes in the output of the
/// synchronous pass, and what resolves it. Created and consumed entirely
/// within a single `resolve()` call.
struct ExpansionJob {
    offset: usize,
    expression: String,
    kind: DeferredKind,
}

enum DeferredKind {
    Command { name: String },
    Prompt { text: String, remember: bool, memory_key: String },
}

pub struct VariableExpander<'a> {
    ctx: &'a InvocationContext<'a>,
    input: &'a InputRecord,
    /// The invocation's own `env` option, consulted before the declaring
    /// scope's defaults and the process environment.
    invocation_env: Option<&'a HashMap<String, String>>,
    /// Joined previous selection, exposed as `${rememberedValue}`.
    remembered_value: String,
}

impl<'a> VariableExpander<'a> {
    pub fn new(
        ctx: &'a InvocationContext<'a>,
        input: &'a InputRecord,
        invocation_env: Option<&'a HashMap<String, String>>,
        remembered_value: String,
    ) -> Self {
        Self {
            ctx,
            input,
            invocation_env,
            remembered_value,
        }
    }

    /// Expands every `${...}` expression in `template`.
    ///
    /// Dollar escaping: the run of `$` before `{` is halved. An even count
    /// leaves the expression literal; an odd count expands it, with the
    /// surviving dollars kept as a literal prefix.
    pub fn resolve(&self, template: &str) -> Result<String, ExpansionError> {
        let mut output = String::with_capacity(template.len());
        let mut jobs: Vec<ExpansionJob> = Vec::new();
        let mut last_end = 0;

        for captures in EXPRESSION.captures_iter(template) {
            let whole = match captures.get(0) {
                Some(m) => m,
                None => continue,
            };
            let dollars = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let content = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

            output.push_str(&template[last_end..whole.start()]);
            last_end = whole.end();

            let literal_prefix = "$".repeat(dollars.len() / 2);
            output.push_str(&literal_prefix);

            if dollars.len() % 2 == 0 {
                // Fully escaped: emit the expression itself, unexpanded.
                output.push('{');
                output.push_str(content);
                output.push('}');
                continue;
            }

            match self.classify(content, whole.start())? {
                Resolution::Now(value) => output.push_str(&value),
                Resolution::Deferred(kind) => jobs.push(ExpansionJob {
                    offset: output.len(),
                    expression: content.to_string(),
                    kind,
                }),
            }
        }
        output.push_str(&template[last_end..]);

        // Splice deferred values back, highest offset first. Offsets were
        // recorded in ascending order, so a reverse walk is strictly
        // descending and earlier text never moves under a pending job.
        for job in jobs.into_iter().rev() {
            let value = self.resolve_deferred(&job)?;
            output.insert_str(job.offset, &value);
        }

        Ok(output)
    }

    /// Decides how one expression resolves. `template_offset` is the match
    /// position in the original template, used to qualify prompt memory keys.
    fn classify(
        &self,
        expression: &str,
        template_offset: usize,
    ) -> Result<Resolution, ExpansionError> {
        if let Some(captures) = INDEXED_FOLDER.captures(expression) {
            let index: usize = captures
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(usize::MAX);
            let path = self
                .ctx
                .workspace
                .folder_by_index(index)
                .map(|folder| folder.path.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Ok(Resolution::Now(path));
        }

        if let Some(name) = expression.strip_prefix("workspaceFolder:") {
            return self.named_folder(expression, name).map(Resolution::Now);
        }
        if let Some(key) = expression.strip_prefix("config:") {
            return self.config_key(expression, key).map(Resolution::Now);
        }
        if let Some(key) = expression.strip_prefix("env:") {
            return Ok(Resolution::Now(self.env_key(key)));
        }
        if let Some(id) = expression.strip_prefix("input:") {
            let value = self
                .ctx
                .session
                .get(&input_session_key(id))
                .unwrap_or_default();
            return Ok(Resolution::Now(value));
        }
        if let Some(id) = expression.strip_prefix("taskId:") {
            let value = self
                .ctx
                .session
                .get(&task_session_key(id))
                .unwrap_or_default();
            return Ok(Resolution::Now(value));
        }
        if let Some(name) = expression.strip_prefix("command:") {
            if name.is_empty() {
                return Err(ExpansionError::new(expression, "missing a command name"));
            }
            return Ok(Resolution::Deferred(DeferredKind::Command {
                name: name.to_string(),
            }));
        }
        if expression == "prompt" || expression.starts_with("prompt:") {
            return Ok(Resolution::Deferred(
                self.prompt_job(expression, template_offset),
            ));
        }

        self.predefined(expression).map(Resolution::Now)
    }

    fn named_folder(&self, expression: &str, name: &str) -> Result<String, ExpansionError> {
        if name.is_empty() {
            return Err(ExpansionError::new(expression, "missing a folder name"));
        }
        self.ctx
            .workspace
            .folder_by_name(name)
            .map(|folder| folder.path.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ExpansionError::new(expression, format!("no workspace folder named '{name}'"))
            })
    }

    fn config_key(&self, expression: &str, key: &str) -> Result<String, ExpansionError> {
        if key.is_empty() {
            return Err(ExpansionError::new(expression, "missing a configuration key"));
        }
        self.ctx
            .workspace
            .config_value(key)
            .map(stringify)
            .ok_or_else(|| {
                ExpansionError::new(expression, format!("configuration key '{key}' not found"))
            })
    }

    /// `env:KEY` never fails: the invocation's own env wins, then the
    /// declaring scope's defaults, then the process environment.
    fn env_key(&self, key: &str) -> String {
        if let Some(env) = self.invocation_env {
            if let Some(value) = env.get(key) {
                return value.clone();
            }
        }
        if let Some(value) = self.input.env.get(key) {
            return value.clone();
        }
        self.ctx.workspace.env.get(key).cloned().unwrap_or_default()
    }

    fn prompt_job(&self, expression: &str, template_offset: usize) -> DeferredKind {
        let query = expression.strip_prefix("prompt:").unwrap_or_default();
        let mut remember = true;
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, raw) = match pair.split_once('=') {
                Some(parts) => parts,
                None => (pair, "true"),
            };
            if key == "rememberPrevious" {
                remember = parse_boolean(
                    Some(&Value::String(raw.to_string())),
                    true,
                    self.ctx.reporter,
                );
            }
        }
        DeferredKind::Prompt {
            text: self.input.id.clone(),
            remember,
            memory_key: format!(
                "{PROMPT_VALUE_PREFIX}/{}#{template_offset}",
                self.input.id
            ),
        }
    }

    fn predefined(&self, expression: &str) -> Result<String, ExpansionError> {
        let workspace = self.ctx.workspace;
        let active_file = workspace.active_file.as_deref();
        let value = match expression {
            "workspaceFolder" => {
                let folder = workspace
                    .folder_by_index(self.input.workspace_index)
                    .or_else(|| workspace.folders.first())
                    .ok_or_else(|| ExpansionError::new(expression, "no open workspace"))?;
                folder.path.to_string_lossy().into_owned()
            }
            "workspaceFolderBasename" => {
                let folder = workspace
                    .folder_by_index(self.input.workspace_index)
                    .or_else(|| workspace.folders.first())
                    .ok_or_else(|| ExpansionError::new(expression, "no open workspace"))?;
                folder.name.clone()
            }
            "file" => active_file
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "fileBasename" => active_file
                .and_then(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "fileBasenameNoExtension" => active_file
                .and_then(|path| path.file_stem())
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "fileDirName" => active_file
                .and_then(|path| path.parent())
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "extension" => active_file
                .and_then(|path| path.extension())
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default(),
            "lineNumber" => workspace
                .line_number
                .map(|line| line.to_string())
                .unwrap_or_default(),
            "rememberedValue" => self.remembered_value.clone(),
            // Unknown bare variables expand to nothing, like the host would.
            _ => String::new(),
        };
        Ok(value)
    }

    fn resolve_deferred(&self, job: &ExpansionJob) -> Result<String, ExpansionError> {
        match &job.kind {
            DeferredKind::Command { name } => {
                let result = self
                    .ctx
                    .commands
                    .execute(name)
                    .map_err(|err| ExpansionError::new(&job.expression, err.to_string()))?;
                match result {
                    Value::String(value) => Ok(value),
                    other => Err(ExpansionError::new(
                        &job.expression,
                        format!(
                            "the command must return a string but returned a {}",
                            crate::core::options::json_type_name(&other)
                        ),
                    )),
                }
            }
            DeferredKind::Prompt {
                text,
                remember,
                memory_key,
            } => {
                let initial = if *remember {
                    self.ctx
                        .persistent
                        .get(memory_key)
                        .and_then(|value| value.as_str().map(str::to_string))
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                let answer = self
                    .ctx
                    .prompter
                    .prompt(text, &initial)
                    .map_err(|err| ExpansionError::new(&job.expression, err.to_string()))?
                    // A dismissed prompt contributes nothing.
                    .unwrap_or_default();
                if *remember && !answer.is_empty() {
                    self.ctx
                        .persistent
                        .set(memory_key, Value::String(answer.clone()));
                }
                Ok(answer)
            }
        }
    }
}

enum Resolution {
    Now(String),
    Deferred(DeferredKind),
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::TestHost;
    use serde_json::json;

    fn expand(host: &TestHost, template: &str) -> Result<String, ExpansionError> {
        let ctx = host.context();
        let input = host.input_record();
        let expander = VariableExpander::new(&ctx, &input, None, "previous".to_string());
        expander.resolve(template)
    }

    #[test]
    fn literal_text_round_trips() {
        let host = TestHost::default();
        assert_eq!(expand(&host, "plain text, no variables").unwrap(), "plain text, no variables");
    }

    #[test]
    fn even_dollar_runs_escape_the_expression() {
        let host = TestHost::default();
        assert_eq!(expand(&host, "$${foo}").unwrap(), "${foo}");
        assert_eq!(expand(&host, "$$$${foo}").unwrap(), "$${foo}");
    }

    #[test]
    fn odd_dollar_runs_keep_a_literal_prefix_and_expand() {
        let host = TestHost::new().with_process_env("X", "value");
        assert_eq!(expand(&host, "${env:X}").unwrap(), "value");
        assert_eq!(expand(&host, "$$${env:X}").unwrap(), "$value");
    }

    #[test]
    fn workspace_folder_variables() {
        let host = TestHost::default();
        assert_eq!(expand(&host, "${workspaceFolder}").unwrap(), "/work/app");
        assert_eq!(expand(&host, "${workspaceFolderBasename}").unwrap(), "app");
        assert_eq!(expand(&host, "${workspaceFolder[0]}").unwrap(), "/work/app");
        // Out-of-range index degrades to empty, like the host does.
        assert_eq!(expand(&host, "${workspaceFolder[9]}").unwrap(), "");
        assert_eq!(expand(&host, "${workspaceFolder:app}").unwrap(), "/work/app");
        let err = expand(&host, "${workspaceFolder:nope}").unwrap_err();
        assert!(err.to_string().contains("workspaceFolder:nope"));
    }

    #[test]
    fn file_variables_follow_the_active_editor() {
        let host = TestHost::new().with_active_file("/work/app/src/main.rs", 42);
        assert_eq!(expand(&host, "${file}").unwrap(), "/work/app/src/main.rs");
        assert_eq!(expand(&host, "${fileBasename}").unwrap(), "main.rs");
        assert_eq!(expand(&host, "${fileBasenameNoExtension}").unwrap(), "main");
        assert_eq!(expand(&host, "${fileDirName}").unwrap(), "/work/app/src");
        assert_eq!(expand(&host, "${extension}").unwrap(), ".rs");
        assert_eq!(expand(&host, "${lineNumber}").unwrap(), "42");
    }

    #[test]
    fn no_editor_degrades_to_empty() {
        let host = TestHost::default();
        assert_eq!(expand(&host, "a${file}b").unwrap(), "ab");
        assert_eq!(expand(&host, "${lineNumber}").unwrap(), "");
    }

    #[test]
    fn unknown_bare_variable_is_empty() {
        let host = TestHost::default();
        assert_eq!(expand(&host, "x ${invalid} y").unwrap(), "x  y");
    }

    #[test]
    fn remembered_value_is_exposed() {
        let host = TestHost::default();
        assert_eq!(expand(&host, "${rememberedValue}").unwrap(), "previous");
    }

    #[test]
    fn env_prefers_invocation_env_over_process_env() {
        let host = TestHost::new().with_process_env("HOME", "/home/user");
        let ctx = host.context();
        let input = host.input_record();
        let own = HashMap::from([("HOME".to_string(), "/custom".to_string())]);
        let expander = VariableExpander::new(&ctx, &input, Some(&own), String::new());
        assert_eq!(expander.resolve("${env:HOME}").unwrap(), "/custom");
        assert_eq!(expander.resolve("${env:MISSING}").unwrap(), "");
        let plain = VariableExpander::new(&ctx, &input, None, String::new());
        assert_eq!(plain.resolve("${env:HOME}").unwrap(), "/home/user");
    }

    #[test]
    fn config_lookup_errors_name_the_expression() {
        let host = TestHost::new().with_setting("editor.tabSize", json!(4));
        assert_eq!(expand(&host, "${config:editor.tabSize}").unwrap(), "4");
        let err = expand(&host, "${config:missing.key}").unwrap_err();
        assert!(err.to_string().contains("config:missing.key"));
        let err = expand(&host, "${config:}").unwrap_err();
        assert!(err.to_string().contains("missing a configuration key"));
    }

    #[test]
    fn session_lookups_by_input_and_task_id() {
        let host = TestHost::default();
        host.session.set(&input_session_key("pickEnv"), "dev");
        host.session.set(&task_session_key("deployTarget"), "prod");
        assert_eq!(expand(&host, "${input:pickEnv}").unwrap(), "dev");
        // Qualified ids share the truncated slot.
        assert_eq!(expand(&host, "${input:pickEnv.launch}").unwrap(), "dev");
        assert_eq!(expand(&host, "${taskId:deployTarget}").unwrap(), "prod");
        assert_eq!(expand(&host, "${input:never}").unwrap(), "");
    }

    #[test]
    fn deferred_command_lands_at_its_original_offset() {
        // The sync ${env:Y} expansion changes the string length before the
        // deferred value is spliced in.
        let host = TestHost::new()
            .with_process_env("Y", "much-longer-value")
            .with_command("getX", json!("X"));
        assert_eq!(
            expand(&host, "echo ${env:Y} ${command:getX} end").unwrap(),
            "echo much-longer-value X end"
        );
    }

    #[test]
    fn multiple_deferred_commands_keep_their_order() {
        let host = TestHost::new()
            .with_command("first", json!("1"))
            .with_command("second", json!("22"));
        assert_eq!(
            expand(&host, "a ${command:first} b ${command:second} c").unwrap(),
            "a 1 b 22 c"
        );
    }

    #[test]
    fn command_returning_non_string_is_an_error() {
        let host = TestHost::new().with_command("broken", json!(["list"]));
        let err = expand(&host, "${command:broken}").unwrap_err();
        assert!(err.to_string().contains("must return a string"));
        let err = expand(&host, "${command:}").unwrap_err();
        assert!(err.to_string().contains("missing a command name"));
    }

    #[test]
    fn prompt_seeds_from_memory_and_persists() {
        let host = TestHost::new().with_prompt_answer("blue");
        assert_eq!(expand(&host, "${prompt}").unwrap(), "blue");
        // The answer was persisted under the position-qualified key.
        let stored = host.persistent.get("promptValue/test-input#0");
        assert_eq!(stored, Some(json!("blue")));
        // Seeds the next prompt with the stored value.
        assert_eq!(host.prompter.last_initial(), "");
        assert_eq!(expand(&host, "${prompt}").unwrap(), "blue");
        assert_eq!(host.prompter.last_initial(), "blue");
    }

    #[test]
    fn prompt_remember_previous_false_neither_seeds_nor_persists() {
        let host = TestHost::new().with_prompt_answer("once");
        host.persistent.set("promptValue/test-input#0", json!("stale"));
        assert_eq!(expand(&host, "${prompt:rememberPrevious=false}").unwrap(), "once");
        assert_eq!(host.prompter.last_initial(), "");
        assert_eq!(host.persistent.get("promptValue/test-input#0"), Some(json!("stale")));
    }
}
