// ABOUTME: Core data models shared by the coaching pipeline crates
// ABOUTME: Re-exports fitness metric domains and records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Provider-agnostic fitness observations. Records are produced by upstream
//! data sources and are read-only everywhere in this workspace.

mod metrics;

pub use metrics::{MetricDomain, MetricRecord};
