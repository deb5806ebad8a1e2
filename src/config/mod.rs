// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Exposes the immutable environment-derived ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the Pierre coaching stream server

/// Environment and server configuration
pub mod environment;

pub use environment::{CorsConfig, ProviderConfig, RecordsConfig, ServerConfig, StreamConfig};
