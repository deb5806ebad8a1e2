// ABOUTME: Health check route handlers for service monitoring and status endpoints
// ABOUTME: Provides liveness and readiness endpoints; readiness reports active coaching streams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::constants::service_names;
use crate::resources::CoachResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<CoachResources>) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .route("/ready", get(Self::ready))
            .with_state(resources)
    }

    async fn health() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "service": service_names::PIERRE_COACH_SERVER,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    async fn ready(State(resources): State<Arc<CoachResources>>) -> Json<Value> {
        Json(json!({
            "status": "ready",
            "provider": resources.provider.name(),
            "active_sessions": resources.sessions.active_count(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}
