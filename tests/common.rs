// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides logging setup, short-timeout configs, record fixtures, and resource wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `pierre_coach_server`

use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use pierre_coach_server::{
    config::environment::ServerConfig,
    llm::{ChatMessage, CoachProvider},
    resources::CoachResources,
    store::{InMemoryRecordsStore, RecordsStore},
};
use pierre_core::models::{MetricDomain, MetricRecord};

static INIT_LOGGER: Once = Once::new();

/// Default athlete used by fixtures
pub const TEST_USER: &str = "athlete-1";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration with short timeouts pointing at `endpoint`
pub fn test_config(endpoint: &str) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.provider.endpoint = endpoint.to_owned();
    config.provider.model = "test-model".to_owned();
    config.provider.connect_timeout = Duration::from_secs(2);
    config.provider.stall_timeout = Duration::from_secs(2);
    config.stream.request_timeout = Duration::from_secs(10);
    config
}

/// `days_ago` days before now, at the same time of day
pub fn days_ago(days_ago: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::days(days_ago)
}

/// Three workouts on consecutive days with increasing duration (30, 40, 50 min)
pub fn three_increasing_workouts() -> Vec<MetricRecord> {
    [(3, 30.0), (2, 40.0), (1, 50.0)]
        .into_iter()
        .map(|(ago, minutes)| {
            MetricRecord::new(
                MetricDomain::Workout,
                days_ago(ago),
                "duration_minutes",
                minutes,
                "min",
            )
        })
        .collect()
}

/// Store holding the workout fixture and one short conversation under `h-1`
pub fn seeded_store() -> InMemoryRecordsStore {
    InMemoryRecordsStore::new()
        .with_records(TEST_USER, three_increasing_workouts())
        .with_history(
            "h-1",
            TEST_USER,
            vec![
                ChatMessage::user("I want to build up to a half marathon"),
                ChatMessage::assistant("Great goal. Let's look at your recent running."),
            ],
        )
}

/// Wire resources for router tests
pub fn create_test_resources(
    config: ServerConfig,
    store: impl RecordsStore + 'static,
    provider: Arc<dyn CoachProvider>,
) -> Arc<CoachResources> {
    init_test_logging();
    Arc::new(CoachResources::new(
        Arc::new(config),
        Arc::new(store),
        provider,
    ))
}
