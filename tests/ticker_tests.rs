//! Display loop tests
//!
//! Drive the ticker against an in-memory frame sink with all delays zeroed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wedpi::config::{TimingConfig, WedpiConfig};
use wedpi::display::{Frame, FrameSink, Matrix};
use wedpi::messages::{prepare_message, MessageQueue};
use wedpi::stream::{Post, StreamHandler, TagListener};
use wedpi::ticker::{Tick, Ticker, TickerContext};

/// Sink that keeps every frame it was given
#[derive(Clone, Default)]
struct RecordingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl FrameSink for RecordingSink {
    fn present(&mut self, frame: &Frame) -> wedpi::Result<()> {
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}

fn config_from(vars: &[(&str, &str)]) -> wedpi::Result<WedpiConfig> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    WedpiConfig::from_lookup(|key| map.get(key).cloned())
}

fn credentials() -> Vec<(&'static str, &'static str)> {
    vec![
        ("TWITTER_CONSUMER_KEY", "key"),
        ("TWITTER_CONSUMER_SECRET", "secret"),
        ("TWITTER_ACCESS_TOKEN", "token"),
        ("TWITTER_ACCESS_SECRET", "token-secret"),
    ]
}

fn ticker(config: WedpiConfig) -> (Ticker<Matrix<RecordingSink>>, RecordingSink) {
    let sink = RecordingSink::default();
    let ctx = TickerContext::new(config.with_timing(TimingConfig::immediate()));
    (Ticker::new(Matrix::new(sink.clone()), ctx), sink)
}

#[test]
fn test_messages_cycle_forever() {
    let queue = MessageQueue::new();
    queue.enqueue(prepare_message("A").unwrap());
    queue.enqueue(prepare_message("B").unwrap());

    let mut seen = Vec::new();
    for _ in 0..6 {
        let next = queue.try_dequeue().unwrap();
        seen.push(next.text().to_string());
        queue.task_done().unwrap();
        queue.enqueue(next);
    }

    assert_eq!(seen, vec!["A", "B", "A", "B", "A", "B"]);
    assert_eq!(queue.size(), 2);
    assert_eq!(queue.unfinished_tasks(), 2);
}

#[test]
fn test_ticker_rotates_queue() {
    let (mut ticker, _) = ticker(WedpiConfig::default());
    let queue = ticker.context().queue().clone();
    queue.enqueue(prepare_message("A").unwrap());
    queue.enqueue(prepare_message("B").unwrap());

    for _ in 0..5 {
        ticker.step().unwrap();
    }

    // Five steps: A B A B A, so B is now at the head
    assert_eq!(queue.try_dequeue().unwrap().text(), "B");
    assert_eq!(queue.try_dequeue().unwrap().text(), "A");
    assert!(queue.try_dequeue().is_none());
}

#[test]
fn test_hello_requeued_after_display() {
    let queue = MessageQueue::new();
    queue.enqueue(prepare_message("HELLO").unwrap());

    let hello = queue.try_dequeue().unwrap();
    assert_eq!(hello.text(), "HELLO");
    assert_eq!(queue.size(), 0);

    let (mut ticker, sink) = ticker(WedpiConfig::default());
    ticker.context().queue().enqueue(hello.clone());
    assert!(matches!(ticker.step().unwrap(), Tick::Displayed(_)));
    assert!(!sink.frames.lock().is_empty());

    let queue = ticker.context().queue();
    assert_eq!(queue.size(), 1);
    assert_eq!(queue.try_dequeue().unwrap(), hello);
}

#[test]
fn test_empty_queue_does_not_block() {
    let (mut ticker, sink) = ticker(WedpiConfig::default());
    assert_eq!(ticker.step().unwrap(), Tick::Empty);
    assert_eq!(ticker.step().unwrap(), Tick::Empty);
    assert!(sink.frames.lock().is_empty());
}

#[test]
fn test_clear_empties_pending_messages() {
    let queue = MessageQueue::new();
    queue.enqueue(prepare_message("one").unwrap());
    queue.enqueue(prepare_message("two").unwrap());
    queue.clear().unwrap();
    assert!(queue.try_dequeue().is_none());
    assert_eq!(queue.unfinished_tasks(), 0);
}

#[test]
fn test_listener_to_display() {
    let config = config_from(&credentials()).unwrap();
    let (mut ticker, _) = ticker(config);
    let listener = TagListener::new(ticker.context().clone());

    listener.on_message(&Post::new("Chemayne", "Excited for #TuffWed!"));
    listener.on_message(&Post::new("Lewis", "RT @chemayne: Excited for #TuffWed!"));

    assert_eq!(ticker.context().queue().size(), 1);
    assert!(matches!(ticker.step().unwrap(), Tick::Displayed(_)));

    let shown = ticker.context().queue().try_dequeue().unwrap();
    assert_eq!(shown.text(), ">>>>> @CHEMAYNE: EXCITED FOR !");
    assert!(!shown.as_str().contains("TUFFWED"));
}

#[test]
fn test_boot_seeds_default_messages() {
    let mut vars = credentials();
    vars.push(("WEDPI_HASHTAG_TO_TRACK", "#party"));
    let config = config_from(&vars).unwrap();
    let (mut ticker, _) = ticker(config);

    // Skip the host lookup
    assert!(ticker.context().mark_booted());
    ticker.boot().unwrap();

    let queue = ticker.context().queue();
    assert_eq!(queue.size(), 3);
    let texts: Vec<String> = std::iter::from_fn(|| queue.try_dequeue())
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(texts[2], "TWEET US USING HASHTAG #PARTY");
}

#[test]
fn test_clear_command_from_post() {
    let mut vars = credentials();
    vars.push(("WEDPI_DEFAULT_MESSAGES", "First|Second"));
    let config = config_from(&vars).unwrap();
    let (mut ticker, _) = ticker(config);
    let listener = TagListener::new(ticker.context().clone());

    listener.on_message(&Post::new("Lewis", ":clear #tuffwed"));
    assert_eq!(ticker.step().unwrap(), Tick::Reset(2));
    assert_eq!(ticker.context().queue().try_dequeue().unwrap().text(), "FIRST");
}
