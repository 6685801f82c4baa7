use super::format::{prepare_message, Message};
use crate::{Result, WedpiError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<Message>,
    /// Enqueued messages not yet marked done
    unfinished: usize,
}

/// Thread-safe FIFO of display messages
///
/// Clones share the same queue. The stream thread enqueues, the display
/// loop dequeues and requeues; nothing is ever dropped except by [`clear`].
///
/// [`clear`]: MessageQueue::clear
#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the tail
    pub fn enqueue(&self, message: Message) {
        let mut state = self.state.lock();
        state.messages.push_back(message);
        state.unfinished += 1;
    }

    /// Take the next message without blocking, `None` when empty
    pub fn try_dequeue(&self) -> Option<Message> {
        self.state.lock().messages.pop_front()
    }

    /// Number of messages waiting
    pub fn size(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    /// Mark one dequeued message as fully processed
    pub fn task_done(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.unfinished == 0 {
            return Err(WedpiError::QueueError(
                "task_done() called too many times".to_string(),
            ));
        }
        state.unfinished -= 1;
        Ok(())
    }

    /// Messages enqueued but not yet marked done
    pub fn unfinished_tasks(&self) -> usize {
        self.state.lock().unfinished
    }

    /// Drop every waiting message
    ///
    /// The dropped messages count as done, so messages already dequeued keep
    /// their pending accounting and the queue can be reused straight away.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        let waiting = state.messages.len();
        let unfinished = state.unfinished.checked_sub(waiting).ok_or_else(|| {
            WedpiError::QueueError("task_done() called too many times".to_string())
        })?;
        state.unfinished = unfinished;
        state.messages.clear();
        Ok(())
    }

    /// Clear the queue and seed it with the given texts
    ///
    /// Texts that format to nothing are skipped. Returns how many were queued.
    pub fn reset_with<I, S>(&self, texts: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let messages: Vec<Message> = texts
            .into_iter()
            .filter_map(|text| prepare_message(text.as_ref()))
            .collect();

        let mut state = self.state.lock();
        let waiting = state.messages.len();
        state.unfinished = state.unfinished.checked_sub(waiting).ok_or_else(|| {
            WedpiError::QueueError("task_done() called too many times".to_string())
        })?;
        state.messages.clear();

        let count = messages.len();
        state.unfinished += count;
        state.messages.extend(messages);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn msg(text: &str) -> Message {
        prepare_message(text).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("a"));
        queue.enqueue(msg("b"));
        queue.enqueue(msg("c"));

        assert_eq!(queue.try_dequeue(), Some(msg("a")));
        assert_eq!(queue.try_dequeue(), Some(msg("b")));
        assert_eq!(queue.try_dequeue(), Some(msg("c")));
        assert_eq!(queue.try_dequeue(), None);
    }

    #[test]
    fn test_empty_dequeue_does_not_block() {
        let queue = MessageQueue::new();
        assert_eq!(queue.try_dequeue(), None);
        assert_eq!(queue.try_dequeue(), None);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn test_requeue_cycles_forever() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("a"));
        queue.enqueue(msg("b"));

        let mut seen = Vec::new();
        for _ in 0..6 {
            let message = queue.try_dequeue().unwrap();
            seen.push(message.text().to_string());
            queue.task_done().unwrap();
            queue.enqueue(message);
        }

        assert_eq!(seen, vec!["A", "B", "A", "B", "A", "B"]);
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.unfinished_tasks(), 2);
    }

    #[test]
    fn test_size_around_dequeue_and_requeue() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("hello"));

        let message = queue.try_dequeue().unwrap();
        assert_eq!(message.text(), "HELLO");
        assert_eq!(queue.size(), 0);

        queue.task_done().unwrap();
        queue.enqueue(message);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.try_dequeue().unwrap().text(), "HELLO");
    }

    #[test]
    fn test_duplicates_allowed() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("same"));
        queue.enqueue(msg("same"));
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn test_task_done_too_many_times() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("x"));
        queue.try_dequeue();
        assert!(queue.task_done().is_ok());
        assert!(matches!(queue.task_done(), Err(WedpiError::QueueError(_))));
    }

    #[test]
    fn test_clear_empties_pending() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("a"));
        queue.enqueue(msg("b"));
        queue.enqueue(msg("c"));

        // One message is out with the consumer
        let _in_flight = queue.try_dequeue().unwrap();

        queue.clear().unwrap();
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.try_dequeue(), None);
        assert_eq!(queue.unfinished_tasks(), 1);

        queue.task_done().unwrap();
        assert_eq!(queue.unfinished_tasks(), 0);

        queue.enqueue(msg("d"));
        assert_eq!(queue.try_dequeue().unwrap().text(), "D");
    }

    #[test]
    fn test_reset_with_defaults() {
        let queue = MessageQueue::new();
        queue.enqueue(msg("old"));

        let count = queue.reset_with(["welcome", "", "hashtag"]).unwrap();
        assert_eq!(count, 2);
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.unfinished_tasks(), 2);
        assert_eq!(queue.try_dequeue().unwrap().text(), "WELCOME");
        assert_eq!(queue.try_dequeue().unwrap().text(), "HASHTAG");
    }

    #[test]
    fn test_concurrent_producer() {
        let queue = MessageQueue::new();
        let producer = queue.clone();

        let handle = thread::spawn(move || {
            for i in 0..100 {
                producer.enqueue(msg(&format!("post {}", i)));
            }
        });
        handle.join().unwrap();

        let mut received = 0;
        while let Some(message) = queue.try_dequeue() {
            assert_eq!(message.text(), format!("POST {}", received));
            received += 1;
        }
        assert_eq!(received, 100);
    }
}
