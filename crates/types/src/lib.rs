//! Shared type definitions for lambdachain.
//!
//! - [`workflow`]: immutable workflow and step definitions plus structural validation
//! - [`execution`]: per-run execution state and the handler wire envelopes

pub mod execution;
pub mod workflow;

pub use execution::{ErrorCode, ExecutionState, JsonMap, StepResult, StepState, WorkflowError, WorkflowInput, WorkflowOutput};
pub use workflow::{DefinitionError, ErrorHandlerAddressing, StepDefinition, WorkflowDefinition, validate_definition};
