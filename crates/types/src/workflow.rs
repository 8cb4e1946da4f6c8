//! Strongly typed workflow definitions shared across the registry, engine, and CLI.
//!
//! A workflow is an ordered chain of steps. Each step names the handler it is
//! dispatched to, the template used to render its request body, and optionally
//! a recovery step to run when it fails. Definitions are immutable once loaded.

use serde::{Deserialize, Serialize};

pub mod validation;

pub use validation::{DefinitionError, validate_definition};

/// Describes a fully authored workflow, including metadata and sequential steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkflowDefinition {
    /// Canonical workflow identifier (for example, `user_signup_chain`).
    #[serde(default)]
    pub name: String,
    /// Optional descriptive copy surfaced by `list` style commands.
    #[serde(default)]
    pub description: String,
    /// How `error_handler` references on steps are resolved.
    #[serde(default)]
    pub error_handler_addressing: ErrorHandlerAddressing,
    /// Ordered list of workflow steps executed sequentially.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// Creates a positional-addressing workflow from `steps`.
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            name: name.into(),
            steps,
            ..Default::default()
        }
    }

    /// Looks up a step by name.
    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Position of the named step in authoring order.
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name == name)
    }

    /// Index of the first step that participates in normal sequencing.
    pub fn first_runnable_index(&self) -> Option<usize> {
        self.next_runnable_index(0)
    }

    /// Index of the first non-recovery step at or after `from`.
    pub fn next_runnable_index(&self, from: usize) -> Option<usize> {
        self.steps
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, step)| !step.recovery_only)
            .map(|(index, _)| index)
    }

    /// Resolves the recovery step declared by the step at `index`.
    ///
    /// Returns `None` when the step declares no error handler or the reference
    /// cannot be satisfied; validated definitions always satisfy it.
    pub fn error_handler_for(&self, index: usize) -> Option<&StepDefinition> {
        let step = self.steps.get(index)?;
        let reference = step.error_handler_ref()?;
        match self.error_handler_addressing {
            ErrorHandlerAddressing::Positional => self.steps.get(index + 1),
            ErrorHandlerAddressing::ByName => self.step(reference),
        }
    }
}

/// Strategy for resolving a step's `error_handler` reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandlerAddressing {
    /// The recovery step is the declaring step's next positional step. The
    /// reference value only toggles recovery on.
    #[default]
    Positional,
    /// The reference names the recovery step anywhere in the workflow.
    ByName,
}

/// A single step of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StepDefinition {
    /// Step name, unique within its workflow. Templates address recorded state by this name.
    pub name: String,
    /// Identifier of the handler this step is dispatched to.
    #[serde(alias = "lambda")]
    pub handler: String,
    /// Template rendered against the execution state to build the request body.
    #[serde(default)]
    pub input_template: String,
    /// Name under which the step's result is meant to be visible to later steps.
    ///
    /// Informational only; templates reference results by step name.
    #[serde(default, alias = "pass_output_as", skip_serializing_if = "Option::is_none")]
    pub output_binding: Option<String>,
    /// Recovery step reference, interpreted per [`ErrorHandlerAddressing`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handler: Option<String>,
    /// Dispatch deadline for this step in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// When true the step only runs as an error handler.
    #[serde(default, skip_serializing_if = "is_false")]
    pub recovery_only: bool,
}

impl StepDefinition {
    /// Creates a step dispatched to `handler` with the given template.
    pub fn new(name: impl Into<String>, handler: impl Into<String>, input_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: handler.into(),
            input_template: input_template.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper that declares an error handler reference.
    pub fn with_error_handler(mut self, reference: impl Into<String>) -> Self {
        self.error_handler = Some(reference.into());
        self
    }

    /// The declared error handler reference, if any.
    ///
    /// A blank reference declares nothing.
    pub fn error_handler_ref(&self) -> Option<&str> {
        self.error_handler.as_deref().map(str::trim).filter(|reference| !reference.is_empty())
    }

    /// Builder-style helper that marks the step as recovery-only.
    pub fn recovery_only(mut self) -> Self {
        self.recovery_only = true;
        self
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_original_field_names() {
        let yaml = r#"
name: user_signup_chain
description: create then read
steps:
  - name: create
    lambda: user_create
    input_template: '{"data": {"email": "${{ input.data.email }}"}}'
    pass_output_as: created_user
    error_handler: cleanup
  - name: cleanup
    lambda: user_delete
"#;
        let definition: WorkflowDefinition = serde_yaml::from_str(yaml).expect("parse workflow");
        assert_eq!(definition.steps.len(), 2);
        assert_eq!(definition.steps[0].handler, "user_create");
        assert_eq!(definition.steps[0].output_binding.as_deref(), Some("created_user"));
        assert_eq!(definition.error_handler_addressing, ErrorHandlerAddressing::Positional);
        assert!(definition.steps[1].input_template.is_empty());
    }

    #[test]
    fn positional_error_handler_is_next_step() {
        let definition = WorkflowDefinition {
            name: "wf".into(),
            description: String::new(),
            error_handler_addressing: ErrorHandlerAddressing::Positional,
            steps: vec![
                StepDefinition::new("a", "h1", "{}").with_error_handler("anything"),
                StepDefinition::new("b", "h2", "{}"),
            ],
        };
        assert_eq!(definition.error_handler_for(0).map(|s| s.name.as_str()), Some("b"));
        assert!(definition.error_handler_for(1).is_none());
    }

    #[test]
    fn named_error_handler_ignores_position() {
        let definition = WorkflowDefinition {
            name: "wf".into(),
            description: String::new(),
            error_handler_addressing: ErrorHandlerAddressing::ByName,
            steps: vec![
                StepDefinition::new("rollback", "h0", "{}").recovery_only(),
                StepDefinition::new("a", "h1", "{}").with_error_handler("rollback"),
                StepDefinition::new("b", "h2", "{}"),
            ],
        };
        assert_eq!(definition.error_handler_for(1).map(|s| s.name.as_str()), Some("rollback"));
        assert_eq!(definition.first_runnable_index(), Some(1));
        assert_eq!(definition.next_runnable_index(2), Some(2));
        assert_eq!(definition.next_runnable_index(3), None);
    }

    #[test]
    fn blank_error_handler_declares_nothing() {
        let yaml = r#"
name: wf
steps:
  - name: a
    lambda: h1
    error_handler: ""
  - name: b
    lambda: h2
    error_handler: "  "
"#;
        let mut definition: WorkflowDefinition = serde_yaml::from_str(yaml).expect("parse workflow");
        assert_eq!(definition.steps[0].error_handler.as_deref(), Some(""));
        assert!(definition.steps[0].error_handler_ref().is_none());
        assert!(definition.error_handler_for(0).is_none());

        definition.error_handler_addressing = ErrorHandlerAddressing::ByName;
        assert!(definition.error_handler_for(0).is_none());
        assert!(definition.error_handler_for(1).is_none());
    }
}
