// src/constants.rs

/// Discriminant value that marks a configuration record as one of ours.
/// Third-party records may embed a shellpick invocation anywhere inside
/// their own structure; the deep search looks for this marker.
pub const INVOCATION_DISCRIMINANT: &str = "shellpick.execute";

/// Persistent-memory key prefix for remembered selections.
pub const DEFAULT_SELECTION_PREFIX: &str = "defaultSelection";

/// Persistent-memory key prefix for remembered `${prompt}` answers.
/// Keys are position-qualified: `promptValue/<input id>#<offset>`.
pub const PROMPT_VALUE_PREFIX: &str = "promptValue";

/// Separator used when joining a multiselect result, unless overridden.
pub const DEFAULT_MULTISELECT_SEPARATOR: &str = " ";

/// The name of the state file holding persistent memory (in ~/.config/shellpick/).
pub const STATE_FILENAME: &str = "state.json";
