// ABOUTME: Line-buffering SSE (Server-Sent Events) parser for upstream provider byte streams
// ABOUTME: Handles partial lines and split UTF-8 sequences across TCP chunk boundaries, with a line size cap
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # SSE Stream Parser
//!
//! TCP does not align network chunks with SSE line boundaries. Two cases
//! matter here:
//!
//! 1. **Multiple events per TCP chunk**: every complete line in a chunk is
//!    returned, in order.
//! 2. **Partial lines across TCP boundaries**: bytes are buffered until a
//!    newline arrives. Buffering happens on raw bytes, so a multi-byte UTF-8
//!    character split across chunks is reassembled before decoding.
//!
//! A complete line that is not valid UTF-8 is a framing failure. The parser
//! never substitutes replacement characters.
//!
//! Lines are capped at [`MAX_SSE_LINE_BYTES`] by default. An upstream that
//! keeps sending bytes without a newline is rejected instead of buffered, so
//! memory per stream stays bounded by the cap plus one network chunk.

use std::mem;
use std::str::{self, Utf8Error};

use thiserror::Error;

use crate::constants::stream_limits::MAX_SSE_LINE_BYTES;

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` termination signal (`OpenAI` convention)
    Done,
}

/// Upstream bytes that cannot be framed safely
#[derive(Debug, Error)]
pub enum SseParseError {
    /// A complete line contained invalid UTF-8
    #[error("invalid UTF-8 in SSE line: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    /// A line grew past the size cap
    #[error("SSE line of {len} bytes exceeds the {limit} byte limit")]
    LineTooLong {
        /// Bytes seen for the line so far
        len: usize,
        /// Configured cap
        limit: usize,
    },
}

/// Line-buffering SSE parser
#[derive(Debug)]
pub struct SseLineBuffer {
    /// Accumulated bytes not yet terminated by a newline
    buffer: Vec<u8>,
    max_line_len: usize,
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SseLineBuffer {
    /// Create a new empty line buffer with the default line cap
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_line_len(MAX_SSE_LINE_BYTES)
    }

    /// Create a new empty line buffer that rejects lines over `max_line_len` bytes
    #[must_use]
    pub const fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_len,
        }
    }

    /// Feed raw bytes from a TCP chunk, returning any complete SSE events
    ///
    /// Any trailing partial line remains buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`SseParseError::InvalidUtf8`] when a complete line is not valid
    /// UTF-8, and [`SseParseError::LineTooLong`] when a line, complete or
    /// still pending, exceeds the cap. The buffer should be discarded
    /// afterwards.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>, SseParseError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].iter().position(|b| *b == b'\n') {
            self.check_line_len(offset)?;
            let line = &self.buffer[consumed..consumed + offset];
            consumed += offset + 1;
            if let Some(event) = parse_line(line)? {
                events.push(event);
            }
        }
        self.buffer.drain(..consumed);
        self.check_line_len(self.buffer.len())?;

        Ok(events)
    }

    const fn check_line_len(&self, len: usize) -> Result<(), SseParseError> {
        if len > self.max_line_len {
            return Err(SseParseError::LineTooLong {
                len,
                limit: self.max_line_len,
            });
        }
        Ok(())
    }

    /// Flush any remaining buffered content as a final event
    ///
    /// Called when the byte stream ends without a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`SseParseError::InvalidUtf8`] when the leftover bytes are not
    /// valid UTF-8.
    pub fn flush(&mut self) -> Result<Option<SseEvent>, SseParseError> {
        let remaining = mem::take(&mut self.buffer);
        parse_line(&remaining)
    }

    /// Number of bytes waiting for a newline
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_line(raw: &[u8]) -> Result<Option<SseEvent>, SseParseError> {
    let line = str::from_utf8(raw)?.trim();

    // Blank lines separate events; comments start with ':'
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    // Non-data fields (event:, id:, retry:) carry nothing for us
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(SseEvent::Data(data.to_owned())))
}
