//! Invocation-level failures.
//!
//! An [`EngineError`] means the workflow could not run to a result. A step
//! that ran and reported failure is not an `EngineError`; it is carried in
//! the returned output's `error` field.

use lambdachain_registry::RegistryError;
use thiserror::Error;

use crate::{dispatch::TransportError, locator::LocatorError, templates::TemplateError};

/// Coarse failure category, for callers that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Workflow missing or malformed.
    Definition,
    /// A step template could not be parsed or rendered.
    Template,
    /// A handler reference has no usable address.
    Routing,
    /// A handler could not be reached in time.
    Transport,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow '{name}' not found")]
    WorkflowNotFound { name: String },

    #[error(transparent)]
    Definition(RegistryError),

    #[error("step '{step}': {source}")]
    Template {
        step: String,
        #[source]
        source: TemplateError,
    },

    #[error("step '{step}': {source}")]
    Routing {
        step: String,
        #[source]
        source: LocatorError,
    },

    #[error("step '{step}': {source}")]
    Transport {
        step: String,
        #[source]
        source: TransportError,
    },
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::WorkflowNotFound { .. } | EngineError::Definition(_) => FailureKind::Definition,
            EngineError::Template { .. } => FailureKind::Template,
            EngineError::Routing { .. } => FailureKind::Routing,
            EngineError::Transport { .. } => FailureKind::Transport,
        }
    }

    /// Step the failure is attributed to, when there is one.
    pub fn step(&self) -> Option<&str> {
        match self {
            EngineError::Template { step, .. } | EngineError::Routing { step, .. } | EngineError::Transport { step, .. } => Some(step),
            EngineError::WorkflowNotFound { .. } | EngineError::Definition(_) => None,
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NotFound { name } => EngineError::WorkflowNotFound { name },
            other => EngineError::Definition(other),
        }
    }
}
