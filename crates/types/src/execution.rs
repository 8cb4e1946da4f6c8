//! Per-invocation execution state and the envelopes exchanged with handlers.
//!
//! Everything in this module is created fresh for one workflow run and dropped
//! when the run returns. Payload maps are open JSON objects.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Open JSON object used for `data` and `context` payloads.
pub type JsonMap = Map<String, Value>;

/// Input supplied to a workflow or to a single step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// Step payload.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: JsonMap,
    /// Cross-cutting values carried unchanged through the chain.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: JsonMap,
}

impl WorkflowInput {
    pub fn new(data: JsonMap, context: JsonMap) -> Self {
        Self { data, context }
    }

    /// Input carrying only a data payload.
    pub fn from_data(data: JsonMap) -> Self {
        Self {
            data,
            context: JsonMap::new(),
        }
    }
}

/// Output of a step or of a whole workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: JsonMap,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkflowError>,
}

impl WorkflowOutput {
    /// Output that carries only an error, as returned by a failed chain.
    pub fn failed(error: WorkflowError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Projects a handler result into a step output.
    pub fn from_result(result: &StepResult) -> Self {
        Self {
            data: result.data.clone(),
            context: JsonMap::new(),
            error: result.error.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Built-in error codes produced when a handler response cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The response was not content-typed as JSON.
    InvalidResponseType,
    /// The handler answered with a non-success status.
    LambdaError,
    /// The response body did not decode into a step result.
    InvalidJson,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidResponseType => "INVALID_RESPONSE_TYPE",
            ErrorCode::LambdaError => "LAMBDA_ERROR",
            ErrorCode::InvalidJson => "INVALID_JSON",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured step failure. `code` is an open taxonomy tag: handlers may
/// report their own codes besides the [`ErrorCode`] built-ins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowError {
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: String,
}

impl WorkflowError {
    pub fn new(step: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
            code: code.into(),
        }
    }

    /// Error tagged with one of the built-in codes.
    pub fn with_code(step: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(step, message, code.as_str())
    }

    /// True when the code matches the given built-in code.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code == code.as_str()
    }
}

/// Decoded handler response: the wire-level unit exchanged with handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkflowError>,
}

impl StepResult {
    pub fn success(data: JsonMap) -> Self {
        Self { data, error: None }
    }

    /// Result carrying only an error.
    pub fn failure(error: WorkflowError) -> Self {
        Self {
            data: JsonMap::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Recorded input and output of one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub input: WorkflowInput,
    /// Populated only after the step has executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<WorkflowOutput>,
}

impl StepState {
    pub fn with_input(input: WorkflowInput) -> Self {
        Self { input, output: None }
    }
}

/// Mutable state of one workflow run, keyed by step name.
///
/// Owned by a single invocation; never shared between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    #[serde(default)]
    pub steps: IndexMap<String, StepState>,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub completed: bool,
}

impl ExecutionState {
    /// State for a run whose first step receives `input`.
    pub fn seeded(step: impl Into<String>, input: WorkflowInput) -> Self {
        let step = step.into();
        let mut steps = IndexMap::new();
        steps.insert(step.clone(), StepState::with_input(input));
        Self {
            steps,
            current_step: step,
            completed: false,
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepState> {
        self.steps.get(name)
    }

    /// Records `input` for `step`, replacing any earlier record, and makes it current.
    pub fn begin_step(&mut self, step: &str, input: WorkflowInput) {
        self.steps.insert(step.to_string(), StepState::with_input(input));
        self.current_step = step.to_string();
    }

    /// Records the output of `step`. A step without recorded input gets an empty one.
    pub fn record_output(&mut self, step: &str, output: WorkflowOutput) {
        self.steps.entry(step.to_string()).or_default().output = Some(output);
    }

    /// Input recorded for the step currently executing.
    pub fn current_input(&self) -> Option<&WorkflowInput> {
        self.steps.get(&self.current_step).map(|state| &state.input)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<JsonMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<JsonMap>::deserialize(deserializer)?.unwrap_or_default())
}
