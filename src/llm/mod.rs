// ABOUTME: Provider gateway abstraction for streaming coaching completions
// ABOUTME: Defines chat messages, the closed TokenEvent union, and the CoachProvider trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Provider Gateway
//!
//! Upstream language-model providers speak loosely typed, provider-specific
//! chunk formats. Everything past this module sees only [`TokenEvent`], a
//! closed set of three variants.
//!
//! ## Key Types
//!
//! - **`CoachProvider`**: opens one lazy, finite token stream per request
//! - **`TokenEvent`**: `Chunk`, `Done`, or `Error`; at most one terminal event per stream
//! - **`GatewayState`**: the per-stream state machine, logged on each transition
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use pierre_coach_server::intelligence::CoachContext;
//! use pierre_coach_server::llm::{CoachProvider, TokenEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn drain(provider: &dyn CoachProvider, context: &CoachContext) {
//!     let mut tokens = provider.stream_completion(context, CancellationToken::new());
//!     while let Some(event) = tokens.next().await {
//!         if let TokenEvent::Chunk { delta } = event {
//!             print!("{delta}");
//!         }
//!     }
//! }
//! ```

/// OpenAI-compatible streaming gateway (Ollama, vLLM, `LocalAI`, cloud endpoints)
pub mod openai_compatible;
/// Coach persona prompts
pub mod prompts;
/// Line-buffering SSE parser for upstream byte streams
pub mod sse_parser;

pub use openai_compatible::OpenAiCompatibleProvider;

use std::fmt;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::StreamErrorKind;
use crate::intelligence::CoachContext;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Token Events
// ============================================================================

/// One unit of provider output, or a terminal signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// Incremental text fragment
    Chunk {
        /// Text to append to the response
        delta: String,
    },
    /// Provider finished normally
    Done {
        /// Upstream finish reason (`stop`, `length`, ...)
        finish_reason: String,
    },
    /// Provider failed; no further events follow
    Error {
        /// Failure class
        kind: StreamErrorKind,
        /// Human-readable detail
        message: String,
    },
}

impl TokenEvent {
    /// Text chunk
    #[must_use]
    pub fn chunk(delta: impl Into<String>) -> Self {
        Self::Chunk {
            delta: delta.into(),
        }
    }

    /// Normal completion
    #[must_use]
    pub fn done(finish_reason: impl Into<String>) -> Self {
        Self::Done {
            finish_reason: finish_reason.into(),
        }
    }

    /// Terminal failure
    #[must_use]
    pub fn error(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Whether this event ends the stream
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Lazy, finite, non-restartable sequence of token events
pub type TokenStream = Pin<Box<dyn Stream<Item = TokenEvent> + Send>>;

// ============================================================================
// Gateway State Machine
// ============================================================================

/// Lifecycle of one provider stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// Stream created, nothing sent yet
    Idle,
    /// Upstream request in flight, waiting for response headers
    Connecting,
    /// Response headers received, reading body
    Streaming,
    /// Terminal: `Done` emitted
    Completed,
    /// Terminal: `Error` emitted
    Failed,
    /// Terminal: caller cancelled, nothing further emitted
    Cancelled,
}

impl GatewayState {
    /// Whether the state is final
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Lowercase label for log fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// A language-model provider able to stream a coaching completion
///
/// Implementations must observe `cancel` at every suspension point. Once it
/// fires, the upstream connection is dropped and the stream ends without
/// emitting anything further.
pub trait CoachProvider: Send + Sync {
    /// Short provider identifier for logs
    fn name(&self) -> &'static str;

    /// Open a lazy token stream for the given context
    ///
    /// No I/O happens until the returned stream is first polled.
    fn stream_completion(&self, context: &CoachContext, cancel: CancellationToken) -> TokenStream;
}
