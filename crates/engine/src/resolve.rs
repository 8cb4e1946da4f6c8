//! # Path Resolution
//!
//! Builds the evaluation context a template sees and navigates it with
//! dot-separated paths.
//!
//! ## Context shape
//!
//! ```text
//! {
//!   "steps": { "<step>": { "input": {"data": .., "context": ..}, "output": {"data": .., "context": .., "error": ..} } },
//!   "current_step": "<step>",
//!   "completed": false,
//!   "input": {"data": .., "context": ..}        // the current step's recorded input
//! }
//! ```
//!
//! `output` is absent until a step has executed, so references to steps that
//! have not run resolve to nothing.

use lambdachain_types::ExecutionState;
use serde_json::{Map, Value};

/// Root names a template path may start with.
pub const CONTEXT_ROOTS: [&str; 4] = ["steps", "input", "current_step", "completed"];

/// One segment of a template path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key; a purely numeric key also indexes arrays.
    Key(String),
    /// Explicit `[n]` array index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Builds the evaluation context for `state`.
pub fn template_context(state: &ExecutionState) -> Value {
    let mut root = match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let current_input = state
        .current_input()
        .and_then(|input| serde_json::to_value(input).ok())
        .unwrap_or(Value::Null);
    root.insert("input".to_string(), current_input);
    Value::Object(root)
}

/// Navigates `root` along `path`.
///
/// Returns `None` when any segment is missing or applied to a value of the
/// wrong shape.
///
/// # Examples
///
/// ```rust
/// use lambdachain_engine::resolve::{PathSegment, select_path};
/// use serde_json::json;
///
/// let value = json!({"items": [{"id": 7}]});
/// let path = [PathSegment::Key("items".into()), PathSegment::Index(0), PathSegment::Key("id".into())];
/// assert_eq!(select_path(&value, &path), Some(&json!(7)));
/// assert_eq!(select_path(&value, &[PathSegment::Key("missing".into())]), None);
/// ```
pub fn select_path<'a>(root: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Formats a JSON value for raw insertion into a template.
///
/// - **Strings**: inserted as-is, without quotes
/// - **Numbers / Booleans**: their literal form
/// - **Null**: empty string
/// - **Objects / Arrays**: compact JSON
pub fn format_json_value(value: &Value) -> String {
    match value {
        Value::String(string_value) => string_value.clone(),
        Value::Number(number_value) => number_value.to_string(),
        Value::Bool(boolean_value) => boolean_value.to_string(),
        Value::Null => String::new(),
        other_value => other_value.to_string(),
    }
}
