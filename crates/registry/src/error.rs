//! Error types for workflow loading and lookup.

use std::io;

use lambdachain_types::DefinitionError;
use thiserror::Error;

/// Failures surfaced by [`WorkflowRegistry`](crate::WorkflowRegistry) and workflow sources.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("workflow '{name}' not found")]
    NotFound { name: String },

    #[error("failed to read workflow '{name}' from {origin}: {source}")]
    Read {
        name: String,
        origin: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse workflow '{name}' from {origin}: {message}")]
    Parse { name: String, origin: String, message: String },

    #[error("invalid workflow definition: {0}")]
    Invalid(#[from] DefinitionError),
}

impl RegistryError {
    /// Create a workflow not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// True for definition problems (parse or validation) as opposed to missing sources.
    pub fn is_definition_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Invalid(_))
    }
}
