//! Display message formatting
//!
//! The LED font only covers printable ASCII, so every message is uppercased,
//! decomposed (NFKD) and stripped of whatever is left outside ASCII.

use std::fmt;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

/// Whitespace placed on both sides of every message
pub const PADDING: &str = "     ";

/// Text that turns a message into a queue reset request
pub const CLEAR_COMMAND: &str = ":CLEAR";

/// A formatted, display-ready message
///
/// Only [`prepare_message`] creates these, so the contents are always
/// padded, uppercase ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message(String);

impl Message {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The message without its padding
    pub fn text(&self) -> &str {
        self.0.trim()
    }

    /// Whether the message asks for the queue to be reset
    pub fn is_clear_command(&self) -> bool {
        self.0.contains(CLEAR_COMMAND)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Message {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Format raw text for the display
///
/// Returns `None` (and logs) when nothing displayable survives the ASCII
/// conversion; callers skip the message in that case.
pub fn prepare_message(text: &str) -> Option<Message> {
    let upper = text.to_uppercase();

    let ascii: String = upper
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c.is_ascii_control() { ' ' } else { c })
        .collect::<String>()
        .to_ascii_uppercase();

    if ascii.trim().is_empty() {
        // Dropped rather than scrolled as a blank message
        warn!("Failed to encode message {:?}: no displayable characters", text);
        return None;
    }

    Some(Message(format!("{PADDING}{ascii}{PADDING}")))
}
