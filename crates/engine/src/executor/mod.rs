//! The chain executor.
//!
//! Runs a workflow's steps strictly in order against one [`ExecutionState`]
//! owned by the invocation:
//!
//! 1. render the step template against the state
//! 2. resolve the handler address through the injected [`HandlerLocator`]
//! 3. dispatch through the injected [`StepDispatcher`] and record the output
//!
//! A successful step seeds the next runnable step with its result data and
//! its own input context. A failing step may hand off to one recovery step,
//! after which the run ends with the original error either way.

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use lambdachain_registry::WorkflowRegistry;
use lambdachain_types::{
    DefinitionError, ExecutionState, StepDefinition, StepResult, WorkflowDefinition, WorkflowError, WorkflowInput, WorkflowOutput,
};
use tracing::{debug, info, warn};

use crate::{
    dispatch::{DispatchRequest, StepDispatcher},
    error::EngineError,
    locator::HandlerLocator,
    templates::render_step_input,
};

pub mod types;
pub use types::{ChainRun, DEFAULT_STEP_TIMEOUT, ExecutorSettings, RunPhase, StepOutcome, StepRole, StepTelemetryEvent};

/// Executes workflows from a registry against injected routing and transport.
///
/// The executor holds only read-only collaborators, so one instance can serve
/// any number of concurrent invocations.
#[derive(Clone)]
pub struct ChainExecutor {
    registry: Arc<WorkflowRegistry>,
    locator: Arc<dyn HandlerLocator>,
    dispatcher: Arc<dyn StepDispatcher>,
    settings: ExecutorSettings,
}

impl std::fmt::Debug for ChainExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainExecutor")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ChainExecutor {
    pub fn new(registry: Arc<WorkflowRegistry>, locator: Arc<dyn HandlerLocator>, dispatcher: Arc<dyn StepDispatcher>) -> Self {
        Self {
            registry,
            locator,
            dispatcher,
            settings: ExecutorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Loads (or reloads) `name` from the registry's source.
    pub fn load_workflow(&self, name: &str) -> Result<Arc<WorkflowDefinition>, EngineError> {
        Ok(self.registry.load(name)?)
    }

    /// Names of the workflows currently registered, sorted.
    pub fn list_workflows(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Runs `name` and returns only its output.
    ///
    /// A step that reported failure yields `Ok` with `output.error` set;
    /// `Err` means the workflow could not run at all.
    pub async fn execute_chain(&self, name: &str, input: WorkflowInput) -> Result<WorkflowOutput, EngineError> {
        Ok(self.run_chain(name, input).await?.output)
    }

    /// Runs `name` and returns the full execution record.
    pub async fn run_chain(&self, name: &str, input: WorkflowInput) -> Result<ChainRun, EngineError> {
        let definition = self.resolve_definition(name)?;
        let Some(first) = definition.first_runnable_index() else {
            return Err(EngineError::Definition(
                DefinitionError::NoRunnableSteps {
                    workflow: definition.name.clone(),
                }
                .into(),
            ));
        };

        info!(workflow = %definition.name, steps = definition.steps.len(), "starting workflow run");
        let mut recorder = RunRecorder::start();
        let mut state = ExecutionState::seeded(definition.steps[first].name.clone(), input);
        let mut index = first;

        let output = loop {
            let step = &definition.steps[index];
            recorder.enter(RunPhase::Running {
                index,
                step: step.name.clone(),
            });
            let result = self.dispatch_recorded(step, &state, StepRole::Normal, &mut recorder).await?;
            state.record_output(&step.name, WorkflowOutput::from_result(&result));
            let step_context = state.step(&step.name).map(|recorded| recorded.input.context.clone()).unwrap_or_default();

            if let Some(error) = result.error {
                warn!(
                    workflow = %definition.name,
                    step = %step.name,
                    code = %error.code,
                    message = %error.message,
                    "step failed"
                );
                if let Some(recovery) = definition.error_handler_for(index) {
                    let failing_input = state.step(&step.name).map(|recorded| recorded.input.clone()).unwrap_or_default();
                    state.begin_step(&recovery.name, failing_input);
                    let recovered = self.dispatch_recorded(recovery, &state, StepRole::Recovery, &mut recorder).await?;
                    state.record_output(&recovery.name, WorkflowOutput::from_result(&recovered));
                }
                recorder.enter(RunPhase::Failed);
                break WorkflowOutput::failed(attribute(error, &step.name));
            }

            match definition.next_runnable_index(index + 1) {
                Some(next) => {
                    state.begin_step(&definition.steps[next].name, WorkflowInput::new(result.data, step_context));
                    index = next;
                }
                None => {
                    state.completed = true;
                    recorder.enter(RunPhase::Completed);
                    break WorkflowOutput {
                        data: result.data,
                        context: step_context,
                        error: None,
                    };
                }
            }
        };

        let run = recorder.finish(&definition.name, output, state);
        info!(
            workflow = %run.workflow,
            succeeded = run.succeeded(),
            dispatches = run.dispatches,
            elapsed_ms = (run.finished_at - run.started_at).num_milliseconds(),
            "workflow run finished"
        );
        Ok(run)
    }

    /// Executes one step against `state`: render, resolve, dispatch.
    ///
    /// The template sees `state` as is; `state.current_step` should name
    /// `step` so that the `input` root resolves to its recorded input.
    pub async fn execute_step(&self, step: &StepDefinition, state: &ExecutionState) -> Result<StepResult, EngineError> {
        let payload = render_step_input(&step.input_template, state).map_err(|source| EngineError::Template {
            step: step.name.clone(),
            source,
        })?;
        let address = self.locator.resolve(&step.handler).map_err(|source| EngineError::Routing {
            step: step.name.clone(),
            source,
        })?;
        let timeout = step.timeout_ms.map(std::time::Duration::from_millis).unwrap_or(self.settings.default_timeout);

        debug!(
            step = %step.name,
            handler = %step.handler,
            address = %address,
            payload_bytes = payload.len(),
            timeout_ms = timeout.as_millis() as u64,
            "dispatching step"
        );
        self.dispatcher
            .dispatch(DispatchRequest {
                step: &step.name,
                handler: &step.handler,
                address: &address,
                payload,
                timeout,
            })
            .await
            .map_err(|source| EngineError::Transport {
                step: step.name.clone(),
                source,
            })
    }

    /// Invokes a single handler directly with `input` as its request envelope.
    pub async fn invoke_handler(&self, handler: &str, input: WorkflowInput) -> Result<StepResult, EngineError> {
        let step = StepDefinition::new(handler, handler, "");
        let state = ExecutionState::seeded(handler, input);
        self.execute_step(&step, &state).await
    }

    fn resolve_definition(&self, name: &str) -> Result<Arc<WorkflowDefinition>, EngineError> {
        match self.registry.get(name) {
            Ok(definition) => Ok(definition),
            Err(_) => self.load_workflow(name),
        }
    }

    async fn dispatch_recorded(
        &self,
        step: &StepDefinition,
        state: &ExecutionState,
        role: StepRole,
        recorder: &mut RunRecorder,
    ) -> Result<StepResult, EngineError> {
        let started = Instant::now();
        let result = self.execute_step(step, state).await?;
        let outcome = match &result.error {
            Some(error) => StepOutcome::Failed { code: error.code.clone() },
            None => StepOutcome::Succeeded,
        };
        recorder.events.push(StepTelemetryEvent {
            step: step.name.clone(),
            handler: step.handler.clone(),
            role,
            outcome,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

/// Fills in the failing step when a handler reported an error without one.
fn attribute(mut error: WorkflowError, step: &str) -> WorkflowError {
    if error.step.is_empty() {
        error.step = step.to_string();
    }
    error
}

struct RunRecorder {
    started_at: chrono::DateTime<Utc>,
    phases: Vec<RunPhase>,
    events: Vec<StepTelemetryEvent>,
}

impl RunRecorder {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            phases: vec![RunPhase::Pending],
            events: Vec::new(),
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phases.push(phase);
    }

    fn finish(self, workflow: &str, output: WorkflowOutput, state: ExecutionState) -> ChainRun {
        let phase = self.phases.last().cloned().unwrap_or(RunPhase::Pending);
        ChainRun {
            workflow: workflow.to_string(),
            output,
            state,
            phase,
            phases: self.phases,
            dispatches: self.events.len(),
            events: self.events,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
