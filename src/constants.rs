// ABOUTME: System-wide constants and configuration defaults for the coaching stream server
// ABOUTME: Contains environment variable names, default limits, and SSE frame names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Hardcoded defaults used when the corresponding environment variable is
//! unset. Every value here can be overridden through `ServerConfig::from_env`.

/// Service identifiers used in structured logs
pub mod service_names {
    /// Name reported by the coaching stream server
    pub const PIERRE_COACH_SERVER: &str = "pierre-coach-server";
}

/// Environment variable names
pub mod env_vars {
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// Base URL of the OpenAI-compatible provider
    pub const PROVIDER_ENDPOINT: &str = "COACH_PROVIDER_ENDPOINT";
    /// Bearer credential for the provider (optional)
    pub const PROVIDER_API_KEY: &str = "COACH_PROVIDER_API_KEY";
    /// Model identifier sent upstream
    pub const PROVIDER_MODEL: &str = "COACH_PROVIDER_MODEL";
    /// Upstream connect timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: &str = "COACH_CONNECT_TIMEOUT_SECS";
    /// Maximum silence between upstream chunks in seconds
    pub const STALL_TIMEOUT_SECS: &str = "COACH_STALL_TIMEOUT_SECS";
    /// Per-request wall-clock budget in seconds
    pub const REQUEST_TIMEOUT_SECS: &str = "COACH_REQUEST_TIMEOUT_SECS";
    /// Context budget in bytes
    pub const CONTEXT_BUDGET_BYTES: &str = "COACH_CONTEXT_BUDGET_BYTES";
    /// How far back to read records
    pub const RECORDS_LOOKBACK_DAYS: &str = "COACH_RECORDS_LOOKBACK_DAYS";
    /// Optional JSON seed file for the in-memory records store
    pub const RECORDS_PATH: &str = "COACH_RECORDS_PATH";
    /// Comma-separated CORS origins, or `*`
    pub const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
}

/// Default configuration values
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8081;
    /// Default provider base URL (Ollama)
    pub const PROVIDER_ENDPOINT: &str = "http://localhost:11434/v1";
    /// Default model for coaching completions
    pub const PROVIDER_MODEL: &str = "qwen2.5:14b-instruct";
    /// Default connect timeout
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Default stall timeout
    pub const STALL_TIMEOUT_SECS: u64 = 30;
    /// Default wall-clock budget per request
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
    /// Default context budget
    pub const CONTEXT_BUDGET_BYTES: usize = 16_000;
    /// Default records lookback window
    pub const RECORDS_LOOKBACK_DAYS: u32 = 28;
    /// Default CORS policy (any origin)
    pub const CORS_ALLOWED_ORIGINS: &str = "*";
}

/// HTTP-level limits
pub mod http_limits {
    /// Maximum inbound request body size
    pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
    /// Maximum length of a coach message
    pub const MAX_MESSAGE_CHARS: usize = 4_000;
}

/// Upstream stream limits
pub mod stream_limits {
    /// Longest upstream SSE line buffered while waiting for its newline
    pub const MAX_SSE_LINE_BYTES: usize = 1024 * 1024;
}

/// SSE event names written to clients
pub mod sse_events {
    /// Incremental text fragment
    pub const CHUNK: &str = "chunk";
    /// Successful completion
    pub const DONE: &str = "done";
    /// Terminal failure
    pub const ERROR: &str = "error";
}
