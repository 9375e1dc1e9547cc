// src/core/registry.rs
//
// Matches a live invocation against the invocation records declared across
// the configuration scopes. Records are enumerated fresh on every lookup;
// later scopes win, so a folder-local declaration overrides a global one.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use crate::constants::INVOCATION_DISCRIMINANT;
use crate::context::InvocationContext;
use crate::core::errors::{InvocationError, InvocationResult};
use crate::core::options::normalize_command;
use crate::models::{InputRecord, RecordIdentity};

// Configuration data is a JSON tree and cannot alias, but an accidentally
// pathological file should not blow the stack.
const MAX_SEARCH_DEPTH: u32 = 64;

/// Finds the declared record matching `query`.
///
/// When the query carries a `taskId`, matching is by taskId equality alone:
/// two records with identical commands can still be semantically distinct,
/// so the id is the stronger identity. Otherwise the normalized command,
/// stdin, and commandArgs must all be equal.
pub fn resolve_record(
    query: &RecordIdentity,
    ctx: &InvocationContext<'_>,
) -> InvocationResult<InputRecord> {
    let mut result: Option<InputRecord> = None;
    let mut seen_task_ids: HashMap<String, RecordIdentity> = HashMap::new();
    let mut duplicate_task_ids: BTreeSet<String> = BTreeSet::new();

    for scope in ctx.config.scopes() {
        let workspace_index = scope.workspace_index.unwrap_or(0);
        for raw in &scope.inputs {
            let mut found = Vec::new();
            deep_search(raw, 0, &mut found);
            for record_value in found {
                let record = match extract_record(record_value, workspace_index, &scope.env) {
                    Some(record) => record,
                    None => continue,
                };

                if let Some(task_id) = &record.identity.task_id {
                    // The same declaration can legitimately be enumerated once
                    // per workspace folder; only differing bodies are duplicates.
                    if let Some(previous) = seen_task_ids.get(task_id) {
                        if !same_body(previous, &record.identity) {
                            duplicate_task_ids.insert(task_id.clone());
                        }
                    }
                    seen_task_ids.insert(task_id.clone(), record.identity.clone());
                }

                if matches(query, &record.identity) {
                    result = Some(record);
                }
            }
        }
    }

    if !duplicate_task_ids.is_empty() {
        let ids = duplicate_task_ids.into_iter().collect::<Vec<_>>().join(", ");
        ctx.reporter.warn(&format!(
            "Found duplicate 'taskIds'. This field must be unique. Expect strange behaviour. \
             If you are trying to share a remembered value between tasks, please use \
             'rememberAs'. Duplicate taskIds: {ids}"
        ));
    }

    result.ok_or_else(|| InvocationError::InputNotFound {
        command: query.command.clone(),
        task_id: query.task_id.clone().unwrap_or_default(),
    })
}

fn matches(query: &RecordIdentity, record: &RecordIdentity) -> bool {
    match &query.task_id {
        Some(task_id) => record.task_id.as_ref() == Some(task_id),
        None => {
            record.command == query.command
                && record.stdin == query.stdin
                && record.command_args == query.command_args
        }
    }
}

fn same_body(a: &RecordIdentity, b: &RecordIdentity) -> bool {
    a.command == b.command && a.stdin == b.stdin && a.command_args == b.command_args
}

/// Depth-first search for embedded invocation records. A record from a
/// third-party tool may carry one of ours anywhere inside its structure,
/// so every object-valued field is visited.
fn deep_search<'v>(value: &'v Value, depth: u32, found: &mut Vec<&'v Value>) {
    if depth >= MAX_SEARCH_DEPTH {
        log::debug!("Giving up deep search below depth {MAX_SEARCH_DEPTH}.");
        return;
    }
    match value {
        Value::Object(fields) => {
            if fields.get("command").and_then(Value::as_str) == Some(INVOCATION_DISCRIMINANT) {
                found.push(value);
            }
            for child in fields.values() {
                deep_search(child, depth + 1, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                deep_search(child, depth + 1, found);
            }
        }
        _ => {}
    }
}

fn extract_record(
    value: &Value,
    workspace_index: usize,
    env: &HashMap<String, String>,
) -> Option<InputRecord> {
    let fields = value.as_object()?;
    let id = match fields.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            log::debug!("Skipping invocation record without an 'id'.");
            return None;
        }
    };
    let args = fields.get("args").and_then(Value::as_object);

    let identity = match args {
        Some(args) => RecordIdentity {
            task_id: args
                .get("taskId")
                .and_then(Value::as_str)
                .map(str::to_string),
            command: args
                .get("command")
                .and_then(|raw| normalize_command(raw))
                .unwrap_or_default(),
            command_args: args.get("commandArgs").and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            }),
            stdin: args
                .get("stdin")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        None => RecordIdentity::default(),
    };

    Some(InputRecord {
        id,
        workspace_index,
        env: env.clone(),
        identity,
    })
}
