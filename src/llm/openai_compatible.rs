// ABOUTME: OpenAI-compatible streaming gateway for coaching completions (Ollama, vLLM, LocalAI, cloud)
// ABOUTME: Drives the Idle/Connecting/Streaming state machine with connect, stall, and cancellation policies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # OpenAI-Compatible Gateway
//!
//! Works with any endpoint implementing the `OpenAI` chat completions API
//! with `stream: true`.
//!
//! ## Failure mapping
//!
//! | Where | What | Event |
//! |-------|------|-------|
//! | Connecting | connect refused, connect timeout, non-2xx status | `ProviderUnavailable` |
//! | Streaming | malformed JSON, invalid UTF-8, read error, upstream error frame | `ProtocolError` |
//! | Streaming | no bytes within the stall timeout | `Timeout` |
//!
//! Frames that parse but carry no text (role-only deltas, usage frames,
//! empty `choices`) are skipped. Nothing is retried.
//!
//! The stream is pull-driven: the next upstream read happens only when the
//! consumer polls, so at most one network chunk's worth of events is held.

use std::future::Future;
use std::time::Duration;

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sse_parser::{SseEvent, SseLineBuffer};
use super::{ChatMessage, CoachProvider, GatewayState, TokenEvent, TokenStream};
use crate::config::ProviderConfig;
use crate::errors::{AppError, AppResult, StreamErrorKind};
use crate::intelligence::CoachContext;

/// Provider identifier used in logs
const PROVIDER_NAME: &str = "openai-compatible";

/// Finish reason reported when upstream never sent one
const DEFAULT_FINISH_REASON: &str = "stop";

/// Longest slice of an upstream error body copied into an error message
const MAX_ERROR_DETAIL_CHARS: usize = 200;

// ============================================================================
// API Request/Response Types (OpenAI-compatible format)
// ============================================================================

/// Streaming chat completion request
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
}

/// Message structure for OpenAI-compatible API
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

/// Streaming chunk structure
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    error: Option<OpenAiErrorDetail>,
}

/// Choice in streaming chunk
#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: Option<OpenAiDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Delta content in streaming chunk
#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

/// Error detail structure
#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// What one `data:` payload contributes to the token stream
#[derive(Debug, Default, PartialEq, Eq)]
struct DecodedFrame {
    delta: Option<String>,
    finish_reason: Option<String>,
}

/// Decode one `data:` payload
///
/// Returns an error message when the payload cannot be trusted.
fn decode_frame(payload: &str) -> Result<DecodedFrame, String> {
    let chunk: OpenAiStreamChunk = serde_json::from_str(payload)
        .map_err(|e| format!("malformed stream frame from provider: {e}"))?;

    if let Some(error) = chunk.error {
        return Err(format!("provider reported an error mid-stream: {}", error.message));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(DecodedFrame::default());
    };

    Ok(DecodedFrame {
        delta: choice
            .delta
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty()),
        finish_reason: choice.finish_reason,
    })
}

/// Human-readable reason for a rejected upstream request
fn upstream_error_detail(status: StatusCode, body: Option<&str>) -> String {
    let detail = body.and_then(|body| {
        serde_json::from_str::<OpenAiErrorResponse>(body)
            .map(|parsed| parsed.error.message)
            .ok()
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty())
                    .then(|| trimmed.chars().take(MAX_ERROR_DETAIL_CHARS).collect())
            })
    });

    match detail {
        Some(detail) => format!("provider returned HTTP {}: {detail}", status.as_u16()),
        None => format!("provider returned HTTP {}", status.as_u16()),
    }
}

// ============================================================================
// State Machine Driver
// ============================================================================

/// Per-stream state tracking with transition logging
struct GatewayRun {
    state: GatewayState,
    user_id: String,
    model: String,
    chunks: usize,
}

impl GatewayRun {
    fn new(user_id: &str, model: &str) -> Self {
        Self {
            state: GatewayState::Idle,
            user_id: user_id.to_owned(),
            model: model.to_owned(),
            chunks: 0,
        }
    }

    fn advance(&mut self, next: GatewayState) {
        debug!(
            provider = PROVIDER_NAME,
            user.id = %self.user_id,
            from = %self.state,
            to = %next,
            "Gateway state transition"
        );
        self.state = next;
        if next == GatewayState::Cancelled {
            info!(
                provider = PROVIDER_NAME,
                user.id = %self.user_id,
                chunks = self.chunks,
                "Provider stream cancelled by caller"
            );
        }
    }

    fn chunk(&mut self, delta: String) -> TokenEvent {
        self.chunks += 1;
        TokenEvent::chunk(delta)
    }

    fn complete(&mut self, finish_reason: Option<String>) -> TokenEvent {
        self.advance(GatewayState::Completed);
        let finish_reason = finish_reason.unwrap_or_else(|| DEFAULT_FINISH_REASON.to_owned());
        info!(
            provider = PROVIDER_NAME,
            model = %self.model,
            user.id = %self.user_id,
            chunks = self.chunks,
            finish_reason = %finish_reason,
            "Provider stream completed"
        );
        TokenEvent::done(finish_reason)
    }

    fn fail(&mut self, kind: StreamErrorKind, message: String) -> TokenEvent {
        self.advance(GatewayState::Failed);
        warn!(
            provider = PROVIDER_NAME,
            model = %self.model,
            user.id = %self.user_id,
            chunks = self.chunks,
            error.kind = %kind,
            "Provider stream failed: {message}"
        );
        TokenEvent::error(kind, message)
    }
}

/// Timeouts applied by one gateway stream
#[derive(Debug, Clone, Copy)]
struct StreamPolicy {
    connect_timeout: Duration,
    stall_timeout: Duration,
}

/// Await `future` unless `cancel` fires first
async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

fn connect_failure(error: &reqwest::Error, endpoint: &str) -> String {
    if error.is_connect() {
        format!("cannot connect to provider at {endpoint}: {error}")
    } else {
        format!("provider request failed: {error}")
    }
}

/// Drive one request through the gateway state machine
fn drive(
    request: RequestBuilder,
    endpoint: String,
    policy: StreamPolicy,
    cancel: CancellationToken,
    mut run: GatewayRun,
) -> impl Stream<Item = TokenEvent> + Send {
    stream! {
        run.advance(GatewayState::Connecting);

        let Some(sent) =
            until_cancelled(&cancel, time::timeout(policy.connect_timeout, request.send())).await
        else {
            run.advance(GatewayState::Cancelled);
            return;
        };

        let response: Response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                yield run.fail(StreamErrorKind::ProviderUnavailable, connect_failure(&e, &endpoint));
                return;
            }
            Err(_) => {
                yield run.fail(
                    StreamErrorKind::ProviderUnavailable,
                    format!(
                        "provider did not respond within {}s",
                        policy.connect_timeout.as_secs()
                    ),
                );
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let Some(body) =
                until_cancelled(&cancel, time::timeout(policy.connect_timeout, response.text()))
                    .await
            else {
                run.advance(GatewayState::Cancelled);
                return;
            };
            let body = body.ok().and_then(Result::ok);
            yield run.fail(
                StreamErrorKind::ProviderUnavailable,
                upstream_error_detail(status, body.as_deref()),
            );
            return;
        }

        run.advance(GatewayState::Streaming);

        let mut body = Box::pin(response.bytes_stream());
        let mut parser = SseLineBuffer::new();
        let mut finish_reason: Option<String> = None;

        loop {
            let Some(read) =
                until_cancelled(&cancel, time::timeout(policy.stall_timeout, body.next())).await
            else {
                run.advance(GatewayState::Cancelled);
                return;
            };

            let (parsed, at_eof) = match read {
                Ok(Some(Ok(bytes))) => (parser.feed(&bytes), false),
                Ok(None) => (parser.flush().map(|event| event.into_iter().collect()), true),
                Ok(Some(Err(e))) => {
                    yield run.fail(
                        StreamErrorKind::ProtocolError,
                        format!("stream read error: {e}"),
                    );
                    return;
                }
                Err(_) => {
                    yield run.fail(
                        StreamErrorKind::Timeout,
                        format!(
                            "no data from provider for {}ms",
                            policy.stall_timeout.as_millis()
                        ),
                    );
                    return;
                }
            };

            let events: Vec<SseEvent> = match parsed {
                Ok(events) => events,
                Err(e) => {
                    yield run.fail(StreamErrorKind::ProtocolError, e.to_string());
                    return;
                }
            };

            for event in events {
                if cancel.is_cancelled() {
                    run.advance(GatewayState::Cancelled);
                    return;
                }
                match event {
                    SseEvent::Done => {
                        yield run.complete(finish_reason.take());
                        return;
                    }
                    SseEvent::Data(payload) => {
                        let frame = match decode_frame(&payload) {
                            Ok(frame) => frame,
                            Err(message) => {
                                yield run.fail(StreamErrorKind::ProtocolError, message);
                                return;
                            }
                        };
                        if frame.finish_reason.is_some() {
                            finish_reason = frame.finish_reason;
                        }
                        if let Some(delta) = frame.delta {
                            yield run.chunk(delta);
                        } else {
                            debug!(provider = PROVIDER_NAME, "Skipping stream frame without content");
                        }
                    }
                }
            }

            if at_eof {
                if cancel.is_cancelled() {
                    run.advance(GatewayState::Cancelled);
                    return;
                }
                yield run.complete(finish_reason.take());
                return;
            }
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Generic `OpenAI`-compatible coaching provider
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ProviderConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Provider configuration
    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Build the chat completions URL
    fn api_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    /// Add authorization header if API key is configured
    fn add_auth_header(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.bearer_auth(api_key)
        } else {
            request
        }
    }
}

impl CoachProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn stream_completion(&self, context: &CoachContext, cancel: CancellationToken) -> TokenStream {
        let payload = OpenAiRequest {
            model: self.config.model.clone(),
            messages: context
                .to_chat_messages()
                .iter()
                .map(OpenAiMessage::from)
                .collect(),
            stream: true,
        };

        debug!(
            provider = PROVIDER_NAME,
            model = %self.config.model,
            messages = payload.messages.len(),
            "Opening streaming chat completion"
        );

        let request = self.add_auth_header(self.client.post(self.api_url()).json(&payload));
        let policy = StreamPolicy {
            connect_timeout: self.config.connect_timeout,
            stall_timeout: self.config.stall_timeout,
        };

        Box::pin(drive(
            request,
            self.config.endpoint.clone(),
            policy,
            cancel,
            GatewayRun::new(context.user_id(), &self.config.model),
        ))
    }
}
