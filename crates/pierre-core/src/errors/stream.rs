// ABOUTME: Error kinds carried by terminal stream frames once SSE headers are committed
// ABOUTME: Stable wire codes for provider unavailability, protocol failures, timeouts, and cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes for a coaching stream after it has started
///
/// A dropped client is not listed here: disconnects cancel the session
/// silently because nobody is left to receive a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamErrorKind {
    /// Connect failure, connect timeout, or upstream rejected the request
    ProviderUnavailable,
    /// Upstream sent data that cannot be decoded safely
    ProtocolError,
    /// Wall-clock budget or upstream stall limit exceeded
    Timeout,
    /// Session cancelled on request while its client was still listening
    Cancelled,
}

impl StreamErrorKind {
    /// Wire code written into the terminal error frame
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether a client should offer to retry the request
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ProviderUnavailable | Self::Timeout)
    }
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
