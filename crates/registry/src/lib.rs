//! Workflow registry for lambdachain.
//!
//! This crate loads workflow definitions from a [`WorkflowSource`], validates
//! them, and serves them to the engine by name. It also owns the runtime
//! configuration file that maps handler names to addresses.

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod source;

pub use catalog::{CatalogSnapshot, LoadReport, WorkflowRegistry};
pub use config::{ConfigError, HandlerAddress, RuntimeConfig, default_config_path};
pub use document::parse_workflow_document;
pub use error::RegistryError;
pub use source::{DirectoryWorkflowSource, DocumentFormat, InMemoryWorkflowSource, SourceDocument, WorkflowSource};
