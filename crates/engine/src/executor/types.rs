//! Executor settings and the per-run execution record.

use std::time::Duration;

use chrono::{DateTime, Utc};
use lambdachain_registry::RuntimeConfig;
use lambdachain_types::{ExecutionState, WorkflowOutput};
use serde::{Deserialize, Serialize};

/// Deadline applied to a dispatch when neither configuration nor the step sets one.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for a [`ChainExecutor`](super::ChainExecutor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Per-dispatch deadline; `StepDefinition::timeout_ms` overrides it.
    pub default_timeout: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

impl ExecutorSettings {
    /// Settings derived from configuration. A zero `request_timeout_ms` keeps the default.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let default_timeout = match config.request_timeout_ms {
            0 => DEFAULT_STEP_TIMEOUT,
            millis => Duration::from_millis(millis),
        };
        Self { default_timeout }
    }
}

/// Position of a run in its lifecycle. Phases only move forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Pending,
    /// Executing the step at `index` in the definition.
    Running { index: usize, step: String },
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

/// Why a step was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Normal,
    Recovery,
}

/// Classified outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed { code: String },
}

/// One dispatch as observed by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTelemetryEvent {
    pub step: String,
    pub handler: String,
    pub role: StepRole,
    pub outcome: StepOutcome,
    pub elapsed_ms: u64,
}

/// Everything observable about one finished chain run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainRun {
    pub workflow: String,
    pub output: WorkflowOutput,
    pub state: ExecutionState,
    /// Terminal phase, `Completed` or `Failed`.
    pub phase: RunPhase,
    /// Every phase the run passed through, starting with `Pending`.
    pub phases: Vec<RunPhase>,
    pub dispatches: usize,
    pub events: Vec<StepTelemetryEvent>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ChainRun {
    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Completed
    }

    /// Steps dispatched, in order.
    pub fn dispatched_steps(&self) -> Vec<&str> {
        self.events.iter().map(|event| event.step.as_str()).collect()
    }
}
