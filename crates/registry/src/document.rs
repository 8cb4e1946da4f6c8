//! Parsing of workflow documents into validated definitions.

use lambdachain_types::{WorkflowDefinition, validate_definition};
use tracing::warn;

use crate::{
    RegistryError,
    source::{DocumentFormat, SourceDocument},
};

/// Parses and validates the document loaded under `name`.
///
/// A document without a `name` field takes the name it was loaded under. A
/// document whose `name` differs is still registered under the requested name.
pub fn parse_workflow_document(name: &str, document: &SourceDocument) -> Result<WorkflowDefinition, RegistryError> {
    let parse_error = |message: String| RegistryError::Parse {
        name: name.to_string(),
        origin: document.origin.clone(),
        message,
    };

    let mut definition: WorkflowDefinition = match document.format {
        DocumentFormat::Yaml => serde_yaml::from_str(&document.content).map_err(|error| parse_error(error.to_string()))?,
        DocumentFormat::Json => serde_json::from_str(&document.content).map_err(|error| parse_error(error.to_string()))?,
    };

    if definition.name.trim().is_empty() {
        definition.name = name.to_string();
    } else if definition.name != name {
        warn!(
            workflow = %name,
            declared = %definition.name,
            origin = %document.origin,
            "workflow document declares a different name; registering under the requested name"
        );
        definition.name = name.to_string();
    }

    validate_definition(&definition)?;
    Ok(definition)
}
