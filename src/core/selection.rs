// src/core/selection.rs
//
// Decides whether parsed candidates resolve automatically or go through
// the interactive picker, and manages remembered selections.

use serde_json::Value;

use crate::constants::DEFAULT_SELECTION_PREFIX;
use crate::context::{InvocationContext, PickItem, PickRequest};
use crate::core::errors::{InvocationError, InvocationResult};
use crate::models::{CandidateItem, InvocationOptions};

fn selection_key(remember_key: &str) -> String {
    format!("{DEFAULT_SELECTION_PREFIX}/{remember_key}")
}

/// Previously remembered selection for this invocation, oldest format
/// first: entries written by older versions are a bare string and read
/// back as a one-element list.
pub fn remembered_defaults(
    ctx: &InvocationContext<'_>,
    options: &InvocationOptions,
) -> Vec<String> {
    if !options.remember_previous {
        return Vec::new();
    }
    let key = match options.remember_key() {
        Some(key) => key,
        None => return Vec::new(),
    };
    match ctx.persistent.get(&selection_key(key)) {
        Some(Value::String(single)) => vec![single],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Persists a completed selection for future default pre-selection.
pub fn remember_selection(ctx: &InvocationContext<'_>, remember_key: &str, values: &[String]) {
    let stored = Value::Array(
        values
            .iter()
            .map(|value| Value::String(value.clone()))
            .collect(),
    );
    ctx.persistent.set(&selection_key(remember_key), stored);
}

/// Resolves candidates to selected values.
///
/// Returns `Ok(None)` when the user dismisses the picker, which is a
/// cancellation, not a failure. `useFirstResult` (or `useSingleResult`
/// with exactly one candidate) short-circuits the picker entirely.
pub fn select(
    ctx: &InvocationContext<'_>,
    candidates: &[CandidateItem],
    options: &InvocationOptions,
    remembered: &[String],
) -> InvocationResult<Option<Vec<String>>> {
    let auto = options.use_first_result || (options.use_single_result && candidates.len() == 1);
    if auto {
        if let Some(first) = candidates.first() {
            return Ok(Some(vec![first.value.clone()]));
        }
        // Nothing to auto-select; fall through so defaultOptions still show.
    }

    let synthesized: Vec<CandidateItem>;
    let presented: &[CandidateItem] = if candidates.is_empty() {
        synthesized = options
            .default_options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|option| CandidateItem::plain(option))
            .collect();
        &synthesized
    } else {
        candidates
    };

    let items = presented
        .iter()
        .map(|item| {
            let is_default = remembered.contains(&item.value);
            let description = if is_default && !options.multiselect {
                // Flag remembered defaults in single-select mode.
                Some(match &item.description {
                    Some(text) => format!("{text} (Default)"),
                    None => "(Default)".to_string(),
                })
            } else {
                item.description.clone()
            };
            PickItem {
                value: item.value.clone(),
                label: item.label.clone(),
                description,
                detail: item.detail.clone(),
            }
        })
        .collect();

    let request = PickRequest {
        items,
        multiselect: options.multiselect,
        allow_custom: options.allow_custom_values,
        placeholder: options.description.clone(),
        preselected: remembered.to_vec(),
    };

    ctx.picker
        .pick(&request)
        .map_err(|err| InvocationError::collaborator("picker", err))
}
