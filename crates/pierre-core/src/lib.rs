// ABOUTME: Core types for the Pierre coaching stream pipeline
// ABOUTME: Foundation crate with error handling and fitness metric models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Core
//!
//! Foundation crate providing shared types for the coaching pipeline. This
//! crate is designed to change infrequently, enabling incremental compilation
//! benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `StreamErrorKind`
//! - **models**: Fitness metric domains and records

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Core data models (`MetricDomain`, `MetricRecord`)
pub mod models;
