// ABOUTME: Route module organization for the Pierre coaching server HTTP endpoints
// ABOUTME: Assembles the router with request-id, tracing, CORS, and body-limit layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the Pierre coaching server
//!
//! Each domain module contains only route definitions and thin handlers.

/// Coaching stream routes
pub mod coach;
/// Health check and readiness routes
pub mod health;

pub use coach::{CoachRoutes, CoachStreamRequest, REQUEST_ID_HEADER};
pub use health::HealthRoutes;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use http::Request;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::constants::http_limits::MAX_REQUEST_BODY_BYTES;
use crate::middleware::setup_cors;
use crate::resources::CoachResources;

/// Build the complete application router
///
/// Layer order, outermost first: request id assignment, tracing span,
/// request id propagation to the response, CORS. The body size limit is
/// enforced by the JSON extractor, so an oversized body is rejected with
/// `413` before any stream opens.
pub fn router(resources: Arc<CoachResources>) -> Router {
    let cors = setup_cors(&resources.config.cors);

    Router::new()
        .merge(CoachRoutes::routes(Arc::clone(&resources)))
        .merge(HealthRoutes::routes(resources))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request.id = %request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
}
