//! Stream body decoding
//!
//! The filter endpoint sends one JSON object per line, separated by `\r\n`,
//! with blank keep-alive lines in between. Chunks from the HTTP body do not
//! respect line boundaries, so [`LineDecoder`] buffers partial lines.

use super::Post;
use crate::{Result, WedpiError};
use serde_json::Value;
use tracing::warn;

/// Longest partial line kept while waiting for its terminator
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// One decoded line of the stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// A post
    Status(Post),

    /// Undelivered matches because of rate limiting
    Limit { track: u64 },

    /// Stall warning: the client is falling behind
    Warning { code: String, message: String },

    /// The server is about to close the connection
    Disconnect { code: u64, reason: String },

    /// Blank keep-alive line
    KeepAlive,

    /// Anything else (deletes, scrub_geo, ...)
    Other(Value),
}

impl StreamMessage {
    /// Classify a single line
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(StreamMessage::KeepAlive);
        }

        let value: Value = serde_json::from_str(line)
            .map_err(|e| WedpiError::StreamError(format!("malformed stream line: {}", e)))?;

        if let Some(limit) = value.get("limit") {
            let track = limit.get("track").and_then(Value::as_u64).unwrap_or(0);
            return Ok(StreamMessage::Limit { track });
        }

        if let Some(warning) = value.get("warning") {
            return Ok(StreamMessage::Warning {
                code: string_field(warning, "code"),
                message: string_field(warning, "message"),
            });
        }

        if let Some(disconnect) = value.get("disconnect") {
            return Ok(StreamMessage::Disconnect {
                code: disconnect.get("code").and_then(Value::as_u64).unwrap_or(0),
                reason: string_field(disconnect, "reason"),
            });
        }

        if value.get("text").is_some() && value.get("user").is_some() {
            let post: Post = serde_json::from_value(value)
                .map_err(|e| WedpiError::StreamError(format!("malformed status: {}", e)))?;
            return Ok(StreamMessage::Status(post));
        }

        Ok(StreamMessage::Other(value))
    }
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Splits a byte stream into lines
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    overflowed: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed (terminators removed)
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            warn!(
                "Dropping {} bytes without a line terminator",
                self.buffer.len()
            );
            self.buffer.clear();
            self.overflowed = true;
        }

        lines
    }

    /// Bytes of an incomplete line still buffered
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a partial line ever outgrew [`MAX_LINE_BYTES`]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}
