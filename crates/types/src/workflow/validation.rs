//! Structural validation for workflow definitions.
//!
//! These checks run before a definition enters the registry so the executor
//! can rely on non-empty step lists, unique template-addressable step names,
//! and resolvable error handler references.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::{ErrorHandlerAddressing, WorkflowDefinition};

static STEP_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid step name pattern"));

/// Reasons a workflow definition is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("workflow '{workflow}' must declare at least one step")]
    NoSteps { workflow: String },

    #[error("workflow '{workflow}' has no steps outside of recovery-only steps")]
    NoRunnableSteps { workflow: String },

    #[error("workflow '{workflow}' has a step with an invalid name '{step}' (allowed: letters, digits, '_' and '-')")]
    InvalidStepName { workflow: String, step: String },

    #[error("workflow '{workflow}' declares step '{step}' more than once")]
    DuplicateStep { workflow: String, step: String },

    #[error("step '{step}' in workflow '{workflow}' has no handler reference")]
    MissingHandler { workflow: String, step: String },

    #[error("step '{step}' in workflow '{workflow}' declares an error handler but is the last step")]
    ErrorHandlerOutOfRange { workflow: String, step: String },

    #[error("step '{step}' in workflow '{workflow}' references unknown error handler '{handler}'")]
    UnknownErrorHandler { workflow: String, step: String, handler: String },

    #[error("step '{step}' in workflow '{workflow}' cannot be its own error handler")]
    SelfErrorHandler { workflow: String, step: String },

    #[error("step '{step}' in workflow '{workflow}' has a zero timeout_ms")]
    ZeroTimeout { workflow: String, step: String },
}

/// Validates the structural invariants of a workflow definition.
///
/// Returns the first violation found, scanning steps in authoring order.
pub fn validate_definition(definition: &WorkflowDefinition) -> Result<(), DefinitionError> {
    let workflow = definition.name.clone();
    if definition.steps.is_empty() {
        return Err(DefinitionError::NoSteps { workflow });
    }

    let mut seen = HashSet::new();
    for step in &definition.steps {
        if !STEP_NAME_PATTERN.is_match(&step.name) {
            return Err(DefinitionError::InvalidStepName {
                workflow,
                step: step.name.clone(),
            });
        }
        if !seen.insert(step.name.as_str()) {
            return Err(DefinitionError::DuplicateStep {
                workflow,
                step: step.name.clone(),
            });
        }
        if step.handler.trim().is_empty() {
            return Err(DefinitionError::MissingHandler {
                workflow,
                step: step.name.clone(),
            });
        }
        if step.timeout_ms == Some(0) {
            return Err(DefinitionError::ZeroTimeout {
                workflow,
                step: step.name.clone(),
            });
        }
    }

    if definition.first_runnable_index().is_none() {
        return Err(DefinitionError::NoRunnableSteps { workflow });
    }

    let last_index = definition.steps.len() - 1;
    for (index, step) in definition.steps.iter().enumerate() {
        let Some(reference) = step.error_handler_ref() else {
            continue;
        };
        match definition.error_handler_addressing {
            ErrorHandlerAddressing::Positional => {
                if index == last_index {
                    return Err(DefinitionError::ErrorHandlerOutOfRange {
                        workflow,
                        step: step.name.clone(),
                    });
                }
            }
            ErrorHandlerAddressing::ByName => {
                if reference == step.name {
                    return Err(DefinitionError::SelfErrorHandler {
                        workflow,
                        step: step.name.clone(),
                    });
                }
                if definition.step(reference).is_none() {
                    return Err(DefinitionError::UnknownErrorHandler {
                        workflow,
                        step: step.name.clone(),
                        handler: reference.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
