// ABOUTME: Relays provider token events to the client as SSE frames with exactly one terminal frame
// ABOUTME: Enforces the per-request wall-clock budget and reports explicit cancellation as a terminal frame
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Stream Relay
//!
//! [`relay`] turns a provider [`TokenStream`] into client frames:
//!
//! - `Chunk` becomes an `event: chunk` frame, in production order
//! - `Done` becomes one `event: done` frame and ends the relay
//! - `Error` becomes one `event: error` frame and ends the relay
//! - a provider stream that ends with no terminal event becomes a
//!   `PROTOCOL_ERROR` frame, so a listening client always sees exactly one
//!   terminal frame
//! - wall-clock expiry cancels the session and becomes a `TIMEOUT` frame
//! - cancellation through [`SessionRegistry::cancel`] becomes a `CANCELLED`
//!   frame, since the client is still reading
//!
//! The relay owns the [`StreamSession`]. Dropping the relay stream, which is
//! what axum does when the client disconnects, drops the session and with it
//! the provider stream and its upstream connection. No frame is written then
//! because the relay is never polled again.
//!
//! [`SessionRegistry::cancel`]: super::manager::SessionRegistry::cancel

use std::time::Duration;

use async_stream::stream;
use axum::response::sse::Event;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::time;

use super::manager::StreamSession;
use crate::constants::sse_events;
use crate::errors::StreamErrorKind;
use crate::llm::{TokenEvent, TokenStream};
use crate::logging::StreamOutcome;

/// Payload written when a frame cannot be serialized
const FALLBACK_ERROR_DATA: &str =
    r#"{"type":"error","code":"PROTOCOL_ERROR","message":"failed to encode stream frame"}"#;

/// One frame written to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayFrame {
    /// Incremental text
    Chunk {
        /// Text to append
        delta: String,
    },
    /// Successful completion
    Done {
        /// Session request id
        request_id: String,
        /// Upstream finish reason
        finish_reason: String,
    },
    /// Terminal failure
    Error {
        /// Stable error code
        code: StreamErrorKind,
        /// Human-readable detail
        message: String,
    },
}

impl RelayFrame {
    /// SSE `event:` name for this frame
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => sse_events::CHUNK,
            Self::Done { .. } => sse_events::DONE,
            Self::Error { .. } => sse_events::ERROR,
        }
    }

    /// Whether this frame ends the session
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Terminal error frame
    #[must_use]
    pub fn error(code: StreamErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Convert into an axum SSE event
    #[must_use]
    pub fn into_event(self) -> Event {
        let event = Event::default().event(self.event_name());
        match serde_json::to_string(&self) {
            Ok(data) => event.data(data),
            Err(e) => {
                tracing::error!("Failed to serialize relay frame: {e}");
                Event::default()
                    .event(sse_events::ERROR)
                    .data(FALLBACK_ERROR_DATA)
            }
        }
    }
}

/// Terminal frame with the outcome and error kind logged for it
type Terminal = (RelayFrame, StreamOutcome, Option<StreamErrorKind>);

/// Terminal for a session cancelled while its client is still connected
fn cancelled_terminal() -> Terminal {
    (
        RelayFrame::error(StreamErrorKind::Cancelled, "coaching stream was cancelled"),
        StreamOutcome::Cancelled,
        Some(StreamErrorKind::Cancelled),
    )
}

/// What woke the relay loop
enum Step {
    Cancelled,
    Deadline,
    Token(Option<TokenEvent>),
}

/// Relay `tokens` for `session`, ending at the first terminal frame
///
/// The wall-clock budget is measured from the session's start. Every run
/// that is polled to completion yields exactly one terminal frame.
pub fn relay(
    mut session: StreamSession,
    mut tokens: TokenStream,
    budget: Duration,
) -> impl Stream<Item = RelayFrame> + Send {
    stream! {
        let token = session.token().clone();
        let deadline = time::sleep_until(session.started_at() + budget);
        tokio::pin!(deadline);

        let terminal = loop {
            let step = tokio::select! {
                biased;
                () = token.cancelled() => Step::Cancelled,
                () = &mut deadline => Step::Deadline,
                next = tokens.next() => Step::Token(next),
            };

            match step {
                Step::Cancelled => break cancelled_terminal(),
                Step::Deadline => {
                    token.cancel();
                    let frame = RelayFrame::error(
                        StreamErrorKind::Timeout,
                        format!("coaching response exceeded {}ms", budget.as_millis()),
                    );
                    break (frame, StreamOutcome::Failed, Some(StreamErrorKind::Timeout));
                }
                Step::Token(Some(TokenEvent::Chunk { delta })) => {
                    session.record_chunk();
                    yield RelayFrame::Chunk { delta };
                }
                Step::Token(Some(TokenEvent::Done { finish_reason })) => {
                    let frame = RelayFrame::Done {
                        request_id: session.request_id().to_owned(),
                        finish_reason,
                    };
                    break (frame, StreamOutcome::Completed, None);
                }
                Step::Token(Some(TokenEvent::Error { kind, message })) => {
                    let frame = RelayFrame::Error { code: kind, message };
                    break (frame, StreamOutcome::Failed, Some(kind));
                }
                Step::Token(None) if token.is_cancelled() => break cancelled_terminal(),
                Step::Token(None) => {
                    let frame = RelayFrame::error(
                        StreamErrorKind::ProtocolError,
                        "provider stream ended without completing",
                    );
                    break (frame, StreamOutcome::Failed, Some(StreamErrorKind::ProtocolError));
                }
            }
        };

        // Release the upstream connection before the final frame is written
        drop(tokens);

        let (frame, outcome, error) = terminal;
        session.finish(outcome, error);
        yield frame;

        // Deregister on completion rather than whenever the stream is dropped
        drop(session);
    }
}
