// ABOUTME: Intelligence module re-exports from pierre-intelligence plus the context builder
// ABOUTME: Keeps metrics aggregation in the workspace crate and prompt assembly in the server crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Intelligence Module
//!
//! The metrics aggregator lives in the `pierre-intelligence` crate. The
//! context builder stays here because it renders chat messages for the LLM
//! gateway.

pub use pierre_intelligence::*;

/// Bounded coach context assembly
pub mod context_builder;

pub use context_builder::CoachContext;
