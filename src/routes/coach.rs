// ABOUTME: Coaching stream route handlers: open a live SSE coaching response or cancel one
// ABOUTME: Validates input and builds context before streaming so every error status precedes the first frame
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coach Routes
//!
//! - `POST /ai/coach/stream`: body `{userId, message, historyToken?}`, answers
//!   with an SSE stream of `chunk` frames and exactly one `done` or `error`
//!   frame
//! - `DELETE /ai/coach/stream/:request_id`: cancel an active stream; the open
//!   response ends with one `error` frame coded `CANCELLED`
//!
//! Everything that can fail with an HTTP status (body validation, duplicate
//! request id, history lookup, records query) happens before the response
//! headers are committed. After that, failures travel as `error` frames.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use futures_util::{Stream, StreamExt};
use pierre_core::models::MetricDomain;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::constants::http_limits::MAX_MESSAGE_CHARS;
use crate::errors::{AppError, AppResult};
use crate::intelligence::{summarize, CoachContext};
use crate::llm::ChatMessage;
use crate::logging::{AppLogger, StreamOutcome};
use crate::resources::CoachResources;
use crate::sse::relay;
use crate::store::RecordsQuery;

/// Header carrying the request id (set by the request-id middleware when absent)
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request body for `POST /ai/coach/stream`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachStreamRequest {
    /// User asking the coach
    pub user_id: String,
    /// The user's message
    pub message: String,
    /// Conversation to continue, if any
    #[serde(default)]
    pub history_token: Option<String>,
}

impl CoachStreamRequest {
    /// Check field contents
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank user id, a blank message, or a
    /// message longer than the allowed length.
    pub fn validate(&self) -> AppResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::missing_field("userId"));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::invalid_input("message must not be empty"));
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::invalid_input(format!(
                "message exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }
        if self
            .history_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            return Err(AppError::invalid_input("historyToken must not be blank"));
        }
        Ok(())
    }
}

/// Coaching stream routes
pub struct CoachRoutes;

impl CoachRoutes {
    /// Create the coaching routes
    pub fn routes(resources: Arc<CoachResources>) -> Router {
        Router::new()
            .route("/ai/coach/stream", post(Self::open_stream))
            .route("/ai/coach/stream/:request_id", delete(Self::cancel_stream))
            .with_state(resources)
    }

    /// Open a coaching stream
    async fn open_stream(
        State(resources): State<Arc<CoachResources>>,
        headers: HeaderMap,
        payload: Result<Json<CoachStreamRequest>, JsonRejection>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let request_id = request_id_from(&headers);

        let Json(request) = payload.map_err(|rejection| {
            let message = format!("Invalid request body: {}", rejection.body_text());
            let error = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::payload_too_large(message)
            } else {
                AppError::invalid_input(message)
            };
            error.with_request_id(&request_id)
        })?;
        request
            .validate()
            .map_err(|e| e.with_request_id(&request_id))?;

        let mut session = resources.sessions.open(&request_id, &request.user_id)?;

        let context = match Self::build_context(&resources, &request).await {
            Ok(context) => context,
            Err(e) => {
                session.finish(StreamOutcome::Rejected, None);
                return Err(e.with_request_id(&request_id));
            }
        };

        AppLogger::log_context_built(
            &request_id,
            context.serialized_size(),
            context.budget(),
            context.history_truncated(),
            context.summary_truncated(),
        );

        let tokens = resources
            .provider
            .stream_completion(&context, session.token().clone());

        info!(
            request.id = %request_id,
            user.id = %request.user_id,
            provider = resources.provider.name(),
            "Coach stream opened"
        );

        let frames = relay(session, tokens, resources.config.stream.request_timeout)
            .map(|frame| Ok::<_, Infallible>(frame.into_event()));

        Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
    }

    /// Cancel an active coaching stream
    async fn cancel_stream(
        State(resources): State<Arc<CoachResources>>,
        Path(request_id): Path<String>,
    ) -> Result<StatusCode, AppError> {
        if resources.sessions.cancel(&request_id) {
            info!(request.id = %request_id, "Coach stream cancelled on request");
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(AppError::not_found(format!("Coaching stream '{request_id}'"))
                .with_request_id(request_id))
        }
    }

    /// Read history and records, summarize, and fit everything in the budget
    async fn build_context(
        resources: &CoachResources,
        request: &CoachStreamRequest,
    ) -> AppResult<CoachContext> {
        let mut history = resources
            .store
            .conversation_history(&request.user_id, request.history_token.as_deref())
            .await?;

        let domains: BTreeSet<MetricDomain> = MetricDomain::ALL.into_iter().collect();
        let until = Utc::now();
        let since = until - Duration::days(i64::from(resources.config.records.lookback_days));
        let records = resources
            .store
            .query_records(&RecordsQuery {
                user_id: request.user_id.clone(),
                domains: domains.clone(),
                since,
                until,
            })
            .await?;

        let summary = summarize(&records, &domains);
        history.push(ChatMessage::user(request.message.clone()));

        CoachContext::build(
            request.user_id.clone(),
            &summary,
            &history,
            resources.config.stream.context_budget,
        )
    }
}

/// Request id from the header, or a fresh one when the header is unusable
fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), ToOwned::to_owned)
}
