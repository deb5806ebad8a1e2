// ABOUTME: Centralized resource container shared by the coaching route handlers
// ABOUTME: Holds configuration, the records store, the provider gateway, and the session registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Coach Resources
//!
//! Built once at startup and shared as `Arc<CoachResources>`. Tests build it
//! with an in-memory store and a scripted provider.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::llm::CoachProvider;
use crate::sse::SessionRegistry;
use crate::store::RecordsStore;

/// Shared dependencies for request handlers
#[derive(Clone)]
pub struct CoachResources {
    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
    /// Read-only records and history
    pub store: Arc<dyn RecordsStore>,
    /// Upstream language-model gateway
    pub provider: Arc<dyn CoachProvider>,
    /// Active stream sessions
    pub sessions: SessionRegistry,
}

impl CoachResources {
    /// Create resources with an empty session registry
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        store: Arc<dyn RecordsStore>,
        provider: Arc<dyn CoachProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            sessions: SessionRegistry::new(),
        }
    }
}
