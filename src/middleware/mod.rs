// ABOUTME: HTTP middleware for the coaching server router
// ABOUTME: Cross-origin policy for browser clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// CORS layer construction
pub mod cors;

pub use cors::setup_cors;
