// ABOUTME: System prompts for coaching completions loaded at compile time
// ABOUTME: Provides the coach persona and the framing around the metrics summary block
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # System Prompts
//!
//! Prompts live in markdown files next to this module and are embedded at
//! compile time.

/// Coach persona sent as the system message of every completion
pub const COACH_SYSTEM_PROMPT: &str = include_str!("coach_system.md");

/// Heading placed above the rendered metrics summary
pub const SUMMARY_HEADING: &str = "Recent metrics:";

/// Placeholder used when every domain was dropped or none was requested
pub const EMPTY_SUMMARY_NOTE: &str = "No recent metrics are available for this athlete.";

