//! Stream handler that feeds the display queue

use super::{Post, StreamHandler};
use crate::messages::prepare_message;
use crate::ticker::TickerContext;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Prefix marking a repost
pub const REPOST_MARKER: &str = "RT";

/// "Enhance your calm", the legacy rate-limit status
const ENHANCE_YOUR_CALM: u16 = 420;
const TOO_MANY_REQUESTS: u16 = 429;

/// Turns tagged posts into display messages
pub struct TagListener {
    ctx: Arc<TickerContext>,
    tag: String,
}

impl TagListener {
    pub fn new(ctx: Arc<TickerContext>) -> Self {
        let tag = ctx.config().stream.hashtag.trim().to_uppercase();
        Self { ctx, tag }
    }

    /// Whether a post should be skipped as a repost
    pub fn is_repost(post: &Post) -> bool {
        post.text.starts_with(REPOST_MARKER) || post.retweeted_status.is_some()
    }

    /// Display text for a post: `>>>>> @AUTHOR: BODY` without the tag
    pub fn display_text(&self, post: &Post) -> String {
        let mut body = post.body().to_uppercase();
        if !self.tag.is_empty() {
            body = body.replace(&self.tag, "");
        }
        format!(">>>>> @{}: {}", post.user.name.to_uppercase(), body.trim())
    }
}

impl StreamHandler for TagListener {
    fn on_message(&self, post: &Post) {
        debug!("{}: {}", post.user.name, post.body());

        if Self::is_repost(post) {
            debug!("Skipping repost from {}", post.user.name);
            return;
        }

        let text = self.display_text(post);
        if let Some(message) = prepare_message(&text) {
            self.ctx.queue().enqueue(message);
            info!("Queued post from {} ({} pending)", post.user.name, self.ctx.queue().size());
        }
    }

    fn on_error(&self, code: u16) -> bool {
        error!("Stream error: HTTP {}", code);
        !matches!(code, ENHANCE_YOUR_CALM | TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WedpiConfig;

    fn listener() -> (TagListener, Arc<TickerContext>) {
        let ctx = TickerContext::new(WedpiConfig::default().with_hashtag("#tuffwed"));
        (TagListener::new(ctx.clone()), ctx)
    }

    #[test]
    fn test_post_queued_without_tag() {
        let (listener, ctx) = listener();
        listener.on_message(&Post::new("Zoë", "Excited for #TuffWed!"));

        let message = ctx.queue().try_dequeue().unwrap();
        assert_eq!(message.text(), ">>>>> @ZOE: EXCITED FOR !");
    }

    #[test]
    fn test_every_tag_occurrence_removed() {
        let (listener, _) = listener();
        let text = listener.display_text(&Post::new("a", "#tuffwed one #TUFFWED two"));
        assert_eq!(text, ">>>>> @A: ONE  TWO");
    }

    #[test]
    fn test_reposts_never_queued() {
        let (listener, ctx) = listener();
        listener.on_message(&Post::new("guest", "RT @lewis: #tuffwed hello"));

        let mut marked = Post::new("guest", "quoted #tuffwed");
        marked.retweeted_status = Some(Box::new(serde_json::json!({"text": "x"})));
        listener.on_message(&marked);

        assert_eq!(ctx.queue().size(), 0);
        assert_eq!(ctx.queue().unfinished_tasks(), 0);
    }

    #[test]
    fn test_rate_limit_stops_stream() {
        let (listener, _) = listener();
        assert!(!listener.on_error(420));
        assert!(!listener.on_error(429));
        assert!(listener.on_error(500));
        assert!(listener.on_error(401));
    }
}
