// ABOUTME: Application error types re-exported from the core crate
// ABOUTME: Single import point for AppError, ErrorCode, and stream error kinds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! The error types live in `pierre-core` so that the aggregation crate and
//! the server share one taxonomy. Errors raised before an SSE stream starts
//! become JSON responses through `IntoResponse`; errors after the stream
//! starts are carried by terminal frames.

pub use pierre_core::errors::{
    AppError, AppResult, ErrorCode, ErrorResponse, ErrorResponseDetails, StreamErrorKind,
};
