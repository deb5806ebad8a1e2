// ABOUTME: Shared test helpers and utilities for integration tests
// ABOUTME: Exports the axum request driver, a fake OpenAI-compatible upstream, and a scripted provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

pub mod axum_test;
pub mod fake_upstream;
pub mod scripted_provider;
