//! # lambdachain engine
//!
//! Executes workflows: ordered chains of steps, each rendered from a template,
//! sent to a remote handler, and recorded in a per-run execution state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lambdachain_engine::{ChainExecutor, HttpStepDispatcher, StaticHandlerLocator};
//! use lambdachain_registry::{DirectoryWorkflowSource, WorkflowRegistry};
//! use lambdachain_types::WorkflowInput;
//! use url::Url;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(WorkflowRegistry::new(Arc::new(DirectoryWorkflowSource::new("workflows"))));
//! let locator = StaticHandlerLocator::new().with_route("user_create", Url::parse("http://localhost:8080")?);
//! let executor = ChainExecutor::new(registry, Arc::new(locator), Arc::new(HttpStepDispatcher::new()?));
//!
//! let output = executor.execute_chain("user_signup_chain", WorkflowInput::default()).await?;
//! if let Some(error) = output.error {
//!     eprintln!("{} failed: {} ({})", error.step, error.message, error.code);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **`resolve`**: evaluation context and path navigation for templates
//! - **`templates`**: `${{ ... }}` template parsing and rendering
//! - **`locator`**: handler name to address resolution
//! - **`dispatch`**: HTTP dispatch and response classification
//! - **`executor`**: the chain state machine

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod locator;
pub mod resolve;
pub mod templates;

pub use dispatch::{DispatchRequest, HandlerResponse, HttpStepDispatcher, StepDispatcher, TransportError, TransportErrorKind, classify_response};
pub use error::{EngineError, FailureKind};
pub use executor::{ChainExecutor, ChainRun, ExecutorSettings, RunPhase, StepOutcome, StepRole, StepTelemetryEvent};
pub use locator::{HandlerLocator, LocatorError, StaticHandlerLocator};
pub use templates::{Template, TemplateError, render_step_input, validate_templates};
