// src/core/result_parser.rs
//
// Turns captured process output into the ordered candidate list.

use lazy_static::lazy_static;
use regex::Regex;

use crate::context::{ProcessOutput, Reporter};
use crate::core::errors::{InvocationError, InvocationResult};
use crate::models::{CandidateItem, InvocationOptions};

lazy_static! {
    static ref EOL: Regex = Regex::new(r"\r\n|\r|\n").unwrap();
}

/// Drops exactly one trailing newline; interior newlines are separators.
fn trim_trailing_newline(stream: &str) -> &str {
    stream.strip_suffix('\n').unwrap_or(stream)
}

/// Parses process output into candidates per the configured stream policy
/// and field separator.
///
/// Fails with `EmptyResult` when nothing survives filtering and no
/// `defaultOptions` fallback is configured. When the policy reads stdout
/// only but stderr carried text, a warning is emitted (the command likely
/// partially failed even though stdout was usable).
pub fn parse_candidates(
    output: &ProcessOutput,
    options: &InvocationOptions,
    input_id: &str,
    reporter: &dyn Reporter,
) -> InvocationResult<Vec<CandidateItem>> {
    let stdout = trim_trailing_newline(&output.stdout);
    let stderr = trim_trailing_newline(&output.stderr);

    let mut lines: Vec<&str> = Vec::new();
    if options.stdio.includes_stdout() {
        lines.extend(EOL.split(stdout));
    }
    if options.stdio.includes_stderr() {
        lines.extend(EOL.split(stderr));
    }
    if options.filter_empty_results {
        lines.retain(|line| !line.is_empty());
    }

    if lines.is_empty() && options.default_options.is_none() {
        return Err(InvocationError::empty_result(input_id, stderr));
    }

    if options.warn_on_stderr && !options.stdio.includes_stderr() && !stderr.is_empty() {
        reporter.warn(&format!(
            "The command for input '{input_id}' might have errors. stderr: '{stderr}'. \
             Hint: You can disable this with '\"warnOnStderr\": false'."
        ));
    }

    Ok(lines
        .into_iter()
        .map(|line| split_fields(line, options.field_separator.as_deref()))
        .collect())
}

/// Splits one line into up to 4 fields: value, label, description, detail.
/// Without a separator (or a second field) the whole line is the value and
/// the raw line doubles as the label.
fn split_fields(line: &str, separator: Option<&str>) -> CandidateItem {
    let trimmed = line.trim();
    let fields: Vec<&str> = match separator {
        Some(sep) if !sep.is_empty() => trimmed.split(sep).take(4).collect(),
        _ => vec![trimmed],
    };
    CandidateItem {
        value: fields.first().copied().unwrap_or_default().to_string(),
        label: fields
            .get(1)
            .map(|label| (*label).to_string())
            .unwrap_or_else(|| line.to_string()),
        description: fields.get(2).map(|text| (*text).to_string()),
        detail: fields.get(3).map(|text| (*text).to_string()),
    }
}
