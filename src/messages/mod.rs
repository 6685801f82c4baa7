pub mod format;
pub mod queue;

pub use format::{prepare_message, Message, PADDING};
pub use queue::MessageQueue;
