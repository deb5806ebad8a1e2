// ABOUTME: Main library entry point for the Pierre coaching stream server
// ABOUTME: Aggregates fitness metrics into a bounded context and relays LLM output as live SSE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Coach Server
//!
//! On each coach interaction the server reads the athlete's recent records,
//! reduces them to a per-domain summary, fits summary and conversation
//! history into a byte budget, streams a completion from an OpenAI-compatible
//! provider, and relays the tokens to the client as Server-Sent Events.
//!
//! ## Architecture
//!
//! - **`intelligence`**: metrics aggregation (from `pierre-intelligence`) and the context builder
//! - **`llm`**: provider gateway, token events, upstream SSE parsing
//! - **`sse`**: session registry and the token-to-frame relay
//! - **`store`**: read-only records and history access
//! - **`routes`**: HTTP handlers and the router
//! - **`config`**: immutable environment-derived configuration
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pierre_coach_server::config::environment::ServerConfig;
//! use pierre_coach_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Pierre Coach Server configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Configuration management
pub mod config;

/// Application constants and defaults
pub mod constants;

/// Unified error handling
pub mod errors;

/// Metrics aggregation and coach context assembly
pub mod intelligence;

/// Provider gateway for streaming completions
pub mod llm;

/// Logging configuration and structured stream outcome records
pub mod logging;

/// HTTP middleware
pub mod middleware;

/// Shared resources for request handlers
pub mod resources;

/// HTTP routes
pub mod routes;

/// Server lifecycle
pub mod server;

/// Stream sessions and SSE relay
pub mod sse;

/// Read-only records store
pub mod store;
