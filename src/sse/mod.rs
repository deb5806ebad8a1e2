// ABOUTME: Server-Sent Events (SSE) plumbing for live coaching responses
// ABOUTME: Provides the active-session registry and the token-to-frame relay
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Active stream sessions keyed by request id
pub mod manager;
/// Token event to SSE frame relay
pub mod relay;

pub use manager::{SessionMetadata, SessionRegistry, StreamSession};
pub use relay::{relay, RelayFrame};
