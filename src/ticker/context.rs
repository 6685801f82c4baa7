use crate::config::WedpiConfig;
use crate::messages::MessageQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared by the stream listener and the display loop
#[derive(Debug)]
pub struct TickerContext {
    queue: MessageQueue,
    config: WedpiConfig,
    booted: AtomicBool,
}

impl TickerContext {
    pub fn new(config: WedpiConfig) -> Arc<Self> {
        Arc::new(Self {
            queue: MessageQueue::new(),
            config,
            booted: AtomicBool::new(false),
        })
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    pub fn config(&self) -> &WedpiConfig {
        &self.config
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }

    /// Set the boot flag, returns `true` only for the first caller
    pub fn mark_booted(&self) -> bool {
        self.booted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
