// ABOUTME: Registry of active coaching stream sessions keyed by request id
// ABOUTME: Rejects duplicate request ids and cancels a session's token when its guard drops
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{AppError, AppResult, StreamErrorKind};
use crate::logging::{AppLogger, StreamOutcome};

/// Session metadata exposed for readiness and cancellation
#[derive(Debug, Clone)]
pub struct SessionMetadata {
    /// User the stream belongs to
    pub user_id: String,
    /// Wall-clock time the session opened
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct SessionEntry {
    token: CancellationToken,
    metadata: SessionMetadata,
}

/// Active stream sessions
///
/// Backed by a concurrent map; no guard is ever held across an await.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session
    ///
    /// # Errors
    ///
    /// Returns a conflict error when a session with the same request id is
    /// still active.
    pub fn open(&self, request_id: &str, user_id: &str) -> AppResult<StreamSession> {
        match self.sessions.entry(request_id.to_owned()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "A coaching stream is already active for request {request_id}"
            ))
            .with_request_id(request_id)),
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(SessionEntry {
                    token: token.clone(),
                    metadata: SessionMetadata {
                        user_id: user_id.to_owned(),
                        created_at: Utc::now(),
                    },
                });
                debug!(request.id = %request_id, user.id = %user_id, "Registered stream session");
                Ok(StreamSession {
                    request_id: request_id.to_owned(),
                    token,
                    started_at: Instant::now(),
                    registry: self.clone(),
                    chunks_sent: 0,
                    outcome: None,
                })
            }
        }
    }

    /// Cancel an active session; returns whether one was found
    ///
    /// The relay still owns the session and ends it with a `CANCELLED`
    /// terminal frame.
    #[must_use]
    pub fn cancel(&self, request_id: &str) -> bool {
        self.sessions.get(request_id).is_some_and(|entry| {
            entry.token.cancel();
            true
        })
    }

    /// Whether a session with this request id is active
    #[must_use]
    pub fn is_active(&self, request_id: &str) -> bool {
        self.sessions.contains_key(request_id)
    }

    /// Number of active sessions
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Metadata for one active session
    #[must_use]
    pub fn metadata(&self, request_id: &str) -> Option<SessionMetadata> {
        self.sessions
            .get(request_id)
            .map(|entry| entry.metadata.clone())
    }

    fn remove(&self, request_id: &str) {
        self.sessions.remove(request_id);
    }
}

/// Guard for one active coaching stream
///
/// Dropping the guard cancels the token, deregisters the request id, and
/// logs the session outcome. A guard dropped before [`StreamSession::finish`]
/// is logged as cancelled because the client went away.
#[derive(Debug)]
pub struct StreamSession {
    request_id: String,
    token: CancellationToken,
    started_at: Instant,
    registry: SessionRegistry,
    chunks_sent: usize,
    outcome: Option<(StreamOutcome, Option<StreamErrorKind>)>,
}

impl StreamSession {
    /// Request id this session is registered under
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Cancellation token observed by the provider stream
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// When the session opened
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Count one chunk written to the client
    pub fn record_chunk(&mut self) {
        self.chunks_sent += 1;
    }

    /// Chunks written so far
    #[must_use]
    pub const fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }

    /// Record the terminal outcome before the terminal frame is handed out
    pub fn finish(&mut self, outcome: StreamOutcome, error: Option<StreamErrorKind>) {
        if self.outcome.is_none() {
            self.outcome = Some((outcome, error));
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.token.cancel();
        self.registry.remove(&self.request_id);

        let (outcome, error) = self.outcome.unwrap_or((StreamOutcome::Cancelled, None));
        let duration_ms = u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        AppLogger::log_stream_outcome(
            &self.request_id,
            outcome,
            self.chunks_sent,
            duration_ms,
            error.map(StreamErrorKind::code),
        );
    }
}
