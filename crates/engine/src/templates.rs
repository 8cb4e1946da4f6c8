//! Step input templates.
//!
//! A template is JSON text with `${{ path | filter }}` placeholders. Rendering
//! substitutes each placeholder with a value drawn from the execution state
//! (see [`crate::resolve`]) and requires the result to be a JSON object, since
//! the rendered bytes become the request body sent to a handler.

use lambdachain_types::{ExecutionState, WorkflowDefinition};
use lambdachain_util::http::{BODY_PREVIEW_LIMIT, truncate_response_preview};
use serde_json::Value;
use thiserror::Error;

use crate::error::EngineError;
use crate::resolve::{CONTEXT_ROOTS, PathSegment, format_json_value, select_path, template_context};

const OPEN: &str = "${{";
const CLOSE: &str = "}}";

/// Failure to parse or render a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("template evaluation failed: {message}")]
    Evaluation { message: String },
}

impl TemplateError {
    fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation { message: message.into() }
    }
}

/// Post-processing applied to a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Encode the value as JSON; missing values render `null`.
    Json,
    /// Fail evaluation when the value is missing or `null`.
    Required,
}

impl Filter {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Filter::Json),
            "required" => Some(Filter::Required),
            _ => None,
        }
    }
}

/// One `${{ ... }}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Expression text without delimiters, trimmed.
    pub expression: String,
    pub path: Vec<PathSegment>,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed step input template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
    envelope: bool,
}

impl Template {
    /// Parses `source`, reporting the first syntax error.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if source.trim().is_empty() {
            return Ok(Self {
                parts: Vec::new(),
                envelope: true,
            });
        }

        let mut parts = Vec::new();
        let mut cursor = 0;
        while let Some(relative_start) = source[cursor..].find(OPEN) {
            let start = cursor + relative_start;
            if start > cursor {
                parts.push(Part::Literal(source[cursor..start].to_string()));
            }
            let body_start = start + OPEN.len();
            let Some(relative_end) = source[body_start..].find(CLOSE) else {
                return Err(TemplateError::syntax(start, "unterminated placeholder, expected '}}'"));
            };
            let body_end = body_start + relative_end;
            parts.push(Part::Placeholder(parse_placeholder(&source[body_start..body_end], start)?));
            cursor = body_end + CLOSE.len();
        }
        if cursor < source.len() {
            parts.push(Part::Literal(source[cursor..].to_string()));
        }

        Ok(Self { parts, envelope: false })
    }

    /// Placeholders in source order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.parts.iter().filter_map(|part| match part {
            Part::Placeholder(placeholder) => Some(placeholder),
            Part::Literal(_) => None,
        })
    }

    /// True for a blank template, which renders the current input envelope.
    pub fn is_envelope(&self) -> bool {
        self.envelope
    }

    /// Renders the template against `state`.
    pub fn render(&self, state: &ExecutionState) -> Result<Vec<u8>, TemplateError> {
        if self.envelope {
            let input = state.current_input().cloned().unwrap_or_default();
            return serde_json::to_vec(&input).map_err(|error| TemplateError::evaluation(error.to_string()));
        }

        let context = template_context(state);
        let mut rendered = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => rendered.push_str(text),
                Part::Placeholder(placeholder) => rendered.push_str(&render_placeholder(placeholder, &context)?),
            }
        }

        match serde_json::from_str::<Value>(&rendered) {
            Ok(Value::Object(_)) => Ok(rendered.into_bytes()),
            Ok(_) => Err(TemplateError::evaluation(format!(
                "rendered input is not a JSON object: {}",
                truncate_response_preview(&rendered, BODY_PREVIEW_LIMIT)
            ))),
            Err(error) => Err(TemplateError::evaluation(format!(
                "rendered input is not valid JSON ({error}): {}",
                truncate_response_preview(&rendered, BODY_PREVIEW_LIMIT)
            ))),
        }
    }
}

/// Parses and renders `template` against `state`.
pub fn render_step_input(template: &str, state: &ExecutionState) -> Result<Vec<u8>, TemplateError> {
    Template::parse(template)?.render(state)
}

/// Checks the syntax of every step template in `definition` without executing anything.
pub fn validate_templates(definition: &WorkflowDefinition) -> Result<(), EngineError> {
    for step in &definition.steps {
        Template::parse(&step.input_template).map_err(|source| EngineError::Template {
            step: step.name.clone(),
            source,
        })?;
    }
    Ok(())
}

fn render_placeholder(placeholder: &Placeholder, context: &Value) -> Result<String, TemplateError> {
    let value = select_path(context, &placeholder.path);
    let mut encode = false;
    for filter in &placeholder.filters {
        match filter {
            Filter::Required => {
                if value.is_none_or(Value::is_null) {
                    return Err(TemplateError::evaluation(format!(
                        "required value '{}' is missing",
                        placeholder.expression
                    )));
                }
            }
            Filter::Json => encode = true,
        }
    }

    Ok(match (value, encode) {
        (Some(value), true) => value.to_string(),
        (None, true) => "null".to_string(),
        (Some(value), false) => format_json_value(value),
        (None, false) => String::new(),
    })
}

fn parse_placeholder(body: &str, offset: usize) -> Result<Placeholder, TemplateError> {
    let expression = body.trim();
    if expression.is_empty() {
        return Err(TemplateError::syntax(offset, "empty expression"));
    }

    let mut pieces = expression.split('|').map(str::trim);
    let path_text = pieces.next().unwrap_or_default();
    let path = parse_path(path_text, offset)?;

    let filters = pieces
        .map(|name| Filter::parse(name).ok_or_else(|| TemplateError::syntax(offset, format!("unknown filter '{name}'"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Placeholder {
        expression: expression.to_string(),
        path,
        filters,
    })
}

fn parse_path(text: &str, offset: usize) -> Result<Vec<PathSegment>, TemplateError> {
    if text.is_empty() {
        return Err(TemplateError::syntax(offset, "missing path before filter"));
    }

    let mut path = Vec::new();
    for raw in text.split('.') {
        let (key, mut indices) = match raw.find('[') {
            Some(bracket) => raw.split_at(bracket),
            None => (raw, ""),
        };
        if key.is_empty() || !key.chars().all(is_segment_char) {
            return Err(TemplateError::syntax(offset, format!("invalid path segment '{raw}' in '{text}'")));
        }
        path.push(PathSegment::Key(key.to_string()));

        while !indices.is_empty() {
            let index = indices
                .strip_prefix('[')
                .and_then(|rest| rest.split_once(']'))
                .and_then(|(digits, rest)| digits.parse::<usize>().ok().map(|index| (index, rest)));
            let Some((index, rest)) = index else {
                return Err(TemplateError::syntax(offset, format!("invalid index in segment '{raw}'")));
            };
            path.push(PathSegment::Index(index));
            indices = rest;
        }
    }

    if let Some(PathSegment::Key(root)) = path.first()
        && !CONTEXT_ROOTS.contains(&root.as_str())
    {
        return Err(TemplateError::syntax(
            offset,
            format!("unknown root '{root}', expected one of {}", CONTEXT_ROOTS.join(", ")),
        ));
    }

    Ok(path)
}

fn is_segment_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '-'
}
