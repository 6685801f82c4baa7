//! Social-media stream integration
//!
//! The [`client`] connects to the statuses filter endpoint and feeds decoded
//! posts to a [`StreamHandler`]; the [`listener`] is the handler that turns
//! posts into display messages.

pub mod client;
pub mod decode;
pub mod listener;
pub mod oauth;

pub use client::{StreamClient, StreamHandle};
pub use decode::{LineDecoder, StreamMessage};
pub use listener::TagListener;

use serde::{Deserialize, Serialize};

/// Posting user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,

    /// Handle without the `@`
    #[serde(default)]
    pub screen_name: String,
}

/// Untruncated text of a long post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedText {
    pub full_text: String,
}

/// A status received from the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id_str: Option<String>,

    pub text: String,

    pub user: Author,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_tweet: Option<ExtendedText>,

    /// Present when the status is a repost of another one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted_status: Option<Box<serde_json::Value>>,
}

impl Post {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        let name = author.into();
        Self {
            id_str: None,
            text: text.into(),
            user: Author {
                screen_name: name.clone(),
                name,
            },
            extended_tweet: None,
            retweeted_status: None,
        }
    }

    /// Full text, preferring the untruncated version
    pub fn body(&self) -> &str {
        self.extended_tweet
            .as_ref()
            .map(|extended| extended.full_text.as_str())
            .unwrap_or(&self.text)
    }
}

/// Receives stream events
///
/// Called from the stream thread, so implementations must be shareable.
pub trait StreamHandler: Send + Sync {
    /// A new post arrived
    fn on_message(&self, post: &Post);

    /// The stream reported an error status; return `false` to stop streaming
    fn on_error(&self, code: u16) -> bool;
}
