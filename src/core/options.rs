// src/core/options.rs
//
// The boundary between the loose JSON option bag a record declares and the
// strict `InvocationOptions` the engine runs on. Every coercion happens
// here; nothing loosely-typed travels past this module.

use serde_json::Value;
use std::collections::HashMap;

use crate::context::Reporter;
use crate::core::errors::{InvocationError, InvocationResult};
use crate::models::{InvocationOptions, StdioPolicy};

/// JSON type name as shown in validation and warning messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerces a loosely-typed flag into a strict boolean.
///
/// Missing values take the default silently. Booleans and the
/// case-insensitive strings "true"/"false" parse exactly. Anything else
/// warns once (naming the raw value and the default used) and falls back.
/// Never fails.
pub fn parse_boolean(raw: Option<&Value>, default: bool, reporter: &dyn Reporter) -> bool {
    let value = match raw {
        None | Some(Value::Null) => return default,
        Some(value) => value,
    };
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => {
            let lowered = text.to_lowercase();
            if lowered == "true" {
                true
            } else if lowered == "false" {
                false
            } else {
                reporter.warn(&format!(
                    "Cannot parse the boolean value: {text}, use the default: {default}"
                ));
                default
            }
        }
        other => {
            reporter.warn(&format!(
                "Cannot parse the boolean value: {}, use the default: {default}",
                display_raw(other)
            ));
            default
        }
    }
}

/// Normalizes the `command` field: sequence form is joined with single
/// spaces, string form passes through.
pub fn normalize_command(value: &Value) -> Option<String> {
    match value {
        Value::String(command) => Some(command.clone()),
        Value::Array(parts) => {
            let mut joined = Vec::with_capacity(parts.len());
            for part in parts {
                joined.push(part.as_str()?.to_string());
            }
            Some(joined.join(" "))
        }
        _ => None,
    }
}

fn string_field(
    bag: &serde_json::Map<String, Value>,
    field: &str,
    reporter: &dyn Reporter,
) -> Option<String> {
    match bag.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => {
            reporter.warn(&format!(
                "Ignoring \"{field}\": expected a string but got \"{}\".",
                json_type_name(other)
            ));
            None
        }
    }
}

fn string_array_field(
    bag: &serde_json::Map<String, Value>,
    field: &str,
) -> InvocationResult<Option<Vec<String>>> {
    let raw = match bag.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(raw) => raw,
    };
    let items = raw.as_array().ok_or_else(|| {
        InvocationError::validation(format!(
            "The \"{field}\" property should be an array of strings (if defined) but got \"{}\".",
            json_type_name(raw)
        ))
    })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().ok_or_else(|| {
            InvocationError::validation(format!(
                "The \"{field}\" property should be an array of strings but contains a \"{}\".",
                json_type_name(item)
            ))
        })?;
        out.push(text.to_string());
    }
    Ok(Some(out))
}

/// Parses and validates a raw option bag into `InvocationOptions`.
///
/// A missing or mistyped `command` (or a mistyped `commandArgs`) is a
/// validation error; loosely-typed scalar options are coerced with a
/// warning instead of failing.
pub fn resolve_options(args: &Value, reporter: &dyn Reporter) -> InvocationResult<InvocationOptions> {
    let bag = args.as_object().ok_or_else(|| {
        InvocationError::validation(format!(
            "Invocation arguments should be an object but got \"{}\".",
            json_type_name(args)
        ))
    })?;

    let raw_command = bag
        .get("command")
        .ok_or_else(|| InvocationError::validation("Please specify the \"command\" property."))?;
    let command = normalize_command(raw_command).ok_or_else(|| {
        InvocationError::validation(format!(
            "The \"command\" property should be a string or an array of strings but got \"{}\".",
            json_type_name(raw_command)
        ))
    })?;

    let command_args = string_array_field(bag, "commandArgs")?;
    let default_options = string_array_field(bag, "defaultOptions")?;

    let env = match bag.get("env") {
        None | Some(Value::Null) => None,
        Some(Value::Object(entries)) => {
            let mut map = HashMap::with_capacity(entries.len());
            for (name, value) in entries {
                match value.as_str() {
                    Some(text) => {
                        map.insert(name.clone(), text.to_string());
                    }
                    None => reporter.warn(&format!(
                        "Ignoring env entry \"{name}\": expected a string but got \"{}\".",
                        json_type_name(value)
                    )),
                }
            }
            Some(map)
        }
        Some(other) => {
            return Err(InvocationError::validation(format!(
                "The \"env\" property should be an object of strings (if defined) but got \"{}\".",
                json_type_name(other)
            )));
        }
    };

    let max_buffer = match bag.get("maxBuffer") {
        None | Some(Value::Null) => None,
        Some(raw) => match raw.as_u64() {
            Some(bytes) => Some(bytes),
            None => {
                reporter.warn(&format!(
                    "Ignoring \"maxBuffer\": expected a non-negative integer but got {}.",
                    display_raw(raw)
                ));
                None
            }
        },
    };

    let stdio_raw = string_field(bag, "stdio", reporter);
    let multiselect_separator = string_field(bag, "multiselectSeparator", reporter);

    Ok(InvocationOptions {
        command,
        command_args,
        cwd: string_field(bag, "cwd", reporter),
        env,
        stdin: string_field(bag, "stdin", reporter),
        stdin_resolve_vars: parse_boolean(bag.get("stdinResolveVars"), true, reporter),
        field_separator: string_field(bag, "fieldSeparator", reporter),
        description: string_field(bag, "description", reporter),
        max_buffer,
        task_id: string_field(bag, "taskId", reporter),
        remember_as: string_field(bag, "rememberAs", reporter),
        remember_previous: parse_boolean(bag.get("rememberPrevious"), false, reporter),
        use_first_result: parse_boolean(bag.get("useFirstResult"), false, reporter),
        use_single_result: parse_boolean(bag.get("useSingleResult"), false, reporter),
        allow_custom_values: parse_boolean(bag.get("allowCustomValues"), false, reporter),
        multiselect: parse_boolean(bag.get("multiselect"), false, reporter),
        multiselect_separator: multiselect_separator
            .unwrap_or_else(|| crate::constants::DEFAULT_MULTISELECT_SEPARATOR.to_string()),
        warn_on_stderr: parse_boolean(bag.get("warnOnStderr"), true, reporter),
        filter_empty_results: parse_boolean(bag.get("filterEmptyResults"), true, reporter),
        stdio: StdioPolicy::from_option(stdio_raw.as_deref()),
        default_options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::RecordingReporter;
    use serde_json::json;

    #[test]
    fn parse_boolean_exact_values_warn_nothing() {
        let reporter = RecordingReporter::default();
        for (raw, expected) in [
            (json!(true), true),
            (json!(false), false),
            (json!("true"), true),
            (json!("TRUE"), true),
            (json!("false"), false),
            (json!("fAlse"), false),
        ] {
            assert_eq!(parse_boolean(Some(&raw), !expected, &reporter), expected);
        }
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn parse_boolean_missing_takes_default_silently() {
        let reporter = RecordingReporter::default();
        assert!(parse_boolean(None, true, &reporter));
        assert!(!parse_boolean(Some(&Value::Null), false, &reporter));
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn parse_boolean_garbage_warns_once_per_value() {
        let reporter = RecordingReporter::default();
        assert!(parse_boolean(Some(&json!("yes")), true, &reporter));
        assert_eq!(reporter.warnings().len(), 1);
        assert!(reporter.warnings()[0].contains("yes"));
        assert!(reporter.warnings()[0].contains("true"));

        assert!(!parse_boolean(Some(&json!(42)), false, &reporter));
        assert_eq!(reporter.warnings().len(), 2);
    }

    #[test]
    fn command_sequence_is_joined_with_spaces() {
        let reporter = RecordingReporter::default();
        let options =
            resolve_options(&json!({"command": ["git", "ls-files", "-m"]}), &reporter).unwrap();
        assert_eq!(options.command, "git ls-files -m");
        assert_eq!(options.multiselect_separator, " ");
        assert!(options.warn_on_stderr);
        assert!(options.filter_empty_results);
    }

    #[test]
    fn missing_command_is_a_validation_error() {
        let reporter = RecordingReporter::default();
        let err = resolve_options(&json!({}), &reporter).unwrap_err();
        assert!(err.to_string().contains("\"command\""));
    }

    #[test]
    fn mistyped_command_names_the_observed_type() {
        let reporter = RecordingReporter::default();
        let err = resolve_options(&json!({"command": 7}), &reporter).unwrap_err();
        assert!(err.to_string().contains("got \"number\""));
    }

    #[test]
    fn mistyped_command_args_fail_validation() {
        let reporter = RecordingReporter::default();
        let err = resolve_options(&json!({"command": "ls", "commandArgs": "-la"}), &reporter)
            .unwrap_err();
        assert!(err.to_string().contains("\"commandArgs\""));
        assert!(err.to_string().contains("got \"string\""));
    }

    #[test]
    fn full_bag_round_trips() {
        let reporter = RecordingReporter::default();
        let options = resolve_options(
            &json!({
                "command": "cat tags.txt",
                "taskId": "pickTag",
                "rememberPrevious": "true",
                "multiselect": true,
                "multiselectSeparator": ",",
                "fieldSeparator": "|",
                "stdio": "both",
                "maxBuffer": 1048576,
                "env": {"LANG": "C", "BAD": 3},
                "defaultOptions": ["main"]
            }),
            &reporter,
        )
        .unwrap();
        assert_eq!(options.task_id.as_deref(), Some("pickTag"));
        assert!(options.remember_previous);
        assert!(options.multiselect);
        assert_eq!(options.multiselect_separator, ",");
        assert_eq!(options.stdio, StdioPolicy::Both);
        assert_eq!(options.max_buffer, Some(1_048_576));
        let env = options.env.unwrap();
        assert_eq!(env.get("LANG").map(String::as_str), Some("C"));
        assert!(!env.contains_key("BAD"));
        assert_eq!(options.default_options, Some(vec!["main".to_string()]));
        // The non-string env entry warned.
        assert_eq!(reporter.warnings().len(), 1);
    }
}
