//! Step dispatch: one request to a handler, one classified result back.
//!
//! Every call ends in exactly one of three outcomes:
//!
//! - `Ok(StepResult)` without an error: the handler succeeded
//! - `Ok(StepResult)` carrying a [`WorkflowError`]: a recoverable failure,
//!   either reported by the handler itself or synthesized here from a bad
//!   response (`INVALID_RESPONSE_TYPE`, `LAMBDA_ERROR`, `INVALID_JSON`)
//! - `Err(TransportError)`: the handler could not be reached in time, which is
//!   fatal for the run

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lambdachain_types::{ErrorCode, StepResult, WorkflowError};
use lambdachain_util::{
    http::{BODY_PREVIEW_LIMIT, DEFAULT_CONNECT_TIMEOUT, JSON_MEDIA_TYPE, build_json_client, decode_json_strict, is_json_content_type, truncate_response_preview},
    redact_sensitive,
};
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// A rendered step ready to be sent.
#[derive(Debug, Clone)]
pub struct DispatchRequest<'a> {
    pub step: &'a str,
    pub handler: &'a str,
    pub address: &'a Url,
    /// Rendered request body, a JSON object.
    pub payload: Vec<u8>,
    pub timeout: Duration,
}

/// Sends rendered step payloads to handlers.
#[async_trait]
pub trait StepDispatcher: Send + Sync {
    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<StepResult, TransportError>;
}

/// Which part of the exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    /// Request could not be built or sent.
    Request,
    /// Response body could not be read.
    Body,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
        })
    }
}

/// The handler could not be reached or did not answer in time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure calling {address}: {message}")]
pub struct TransportError {
    pub address: String,
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(address: impl Into<String>, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(address: &Url, error: reqwest::Error, fallback: TransportErrorKind) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else {
            fallback
        };
        Self::new(address.as_str(), kind, error.to_string())
    }
}

/// Raw handler response before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Classifies a received response into a [`StepResult`].
///
/// Checks run in order: content type, status, body decoding. A decodable
/// body is returned unchanged, including any error the handler reported.
pub fn classify_response(step: &str, response: &HandlerResponse) -> StepResult {
    let content_type = response.content_type.as_deref().unwrap_or_default();
    if !is_json_content_type(content_type) {
        let received = if content_type.is_empty() { "<none>" } else { content_type };
        return StepResult::failure(WorkflowError::with_code(
            step,
            ErrorCode::InvalidResponseType,
            format!(
                "expected {JSON_MEDIA_TYPE} response, got {received}: {}",
                truncate_response_preview(&response.body, BODY_PREVIEW_LIMIT)
            ),
        ));
    }

    if !(200..300).contains(&response.status) {
        return StepResult::failure(WorkflowError::with_code(
            step,
            ErrorCode::LambdaError,
            format!("handler returned error: {}", response.body),
        ));
    }

    let status = StatusCode::from_u16(response.status).ok();
    match decode_json_strict::<StepResult>(&response.body, status) {
        Ok(result) => result,
        Err(error) => StepResult::failure(WorkflowError::with_code(step, ErrorCode::InvalidJson, error.to_string())),
    }
}

/// Dispatches steps as `POST` requests with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpStepDispatcher {
    client: Client,
}

impl HttpStepDispatcher {
    /// Builds a dispatcher with its own connection pool.
    pub fn new() -> reqwest::Result<Self> {
        Ok(Self {
            client: build_json_client(DEFAULT_CONNECT_TIMEOUT)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepDispatcher for HttpStepDispatcher {
    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<StepResult, TransportError> {
        let started = Instant::now();
        let response = self
            .client
            .post(request.address.clone())
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .timeout(request.timeout)
            .body(request.payload)
            .send()
            .await
            .map_err(|error| TransportError::from_reqwest(request.address, error, TransportErrorKind::Request))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::from_reqwest(request.address, error, TransportErrorKind::Body))?;

        debug!(
            step = request.step,
            handler = request.handler,
            address = %request.address,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            body = %redact_sensitive(&truncate_response_preview(&body, BODY_PREVIEW_LIMIT)),
            "handler responded"
        );

        Ok(classify_response(
            request.step,
            &HandlerResponse {
                status: status.as_u16(),
                content_type,
                body,
            },
        ))
    }
}
