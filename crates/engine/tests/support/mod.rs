#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use indexmap::IndexMap;
use lambdachain_engine::{ChainExecutor, DispatchRequest, StaticHandlerLocator, StepDispatcher, TransportError, TransportErrorKind};
use lambdachain_registry::{InMemoryWorkflowSource, WorkflowRegistry};
use lambdachain_types::{JsonMap, StepResult, WorkflowDefinition, WorkflowError};
use serde_json::Value;
use url::Url;

/// One dispatch observed by [`RecordingDispatcher`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub step: String,
    pub handler: String,
    pub address: Url,
    pub payload: Value,
    pub timeout_ms: u128,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Result(StepResult),
    /// Reply with the request payload's `data` object, or the whole payload.
    Echo,
    Unreachable,
}

/// Test double that records every dispatch and answers per handler.
///
/// Handlers without a scripted reply echo their payload.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    replies: Mutex<IndexMap<String, Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, handler: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(handler.to_string(), reply);
        self
    }

    pub fn succeed(self, handler: &str, data: Value) -> Self {
        self.reply(handler, Reply::Result(StepResult::success(object(data))))
    }

    pub fn fail(self, handler: &str, step: &str, code: &str) -> Self {
        self.reply(handler, Reply::Result(StepResult::failure(WorkflowError::new(step, format!("{handler} failed"), code))))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dispatched_steps(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.step).collect()
    }
}

#[async_trait]
impl StepDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<StepResult, TransportError> {
        let payload: Value = serde_json::from_slice(&request.payload).expect("rendered payload is JSON");
        self.calls.lock().unwrap().push(RecordedCall {
            step: request.step.to_string(),
            handler: request.handler.to_string(),
            address: request.address.clone(),
            payload: payload.clone(),
            timeout_ms: request.timeout.as_millis(),
        });

        let reply = self.replies.lock().unwrap().get(request.handler).cloned().unwrap_or(Reply::Echo);
        match reply {
            Reply::Result(result) => Ok(result),
            Reply::Echo => {
                let data = payload.get("data").cloned().unwrap_or(payload);
                Ok(StepResult::success(object(data)))
            }
            Reply::Unreachable => Err(TransportError::new(request.address.as_str(), TransportErrorKind::Connect, "connection refused")),
        }
    }
}

pub fn object(value: Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

/// Routes each handler to `http://localhost/<handler>`.
pub fn locator_for(handlers: &[&str]) -> StaticHandlerLocator {
    handlers.iter().fold(StaticHandlerLocator::new(), |locator, handler| {
        locator.with_route(*handler, Url::parse(&format!("http://localhost/{handler}")).unwrap())
    })
}

pub fn registry_with(definitions: Vec<WorkflowDefinition>) -> Arc<WorkflowRegistry> {
    let registry = WorkflowRegistry::new(Arc::new(InMemoryWorkflowSource::new()));
    for definition in definitions {
        registry.insert(definition).expect("valid definition");
    }
    Arc::new(registry)
}

pub fn executor(definitions: Vec<WorkflowDefinition>, handlers: &[&str], dispatcher: Arc<RecordingDispatcher>) -> ChainExecutor {
    ChainExecutor::new(registry_with(definitions), Arc::new(locator_for(handlers)), dispatcher)
}
