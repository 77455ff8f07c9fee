pub mod service;
pub mod thread;

pub use service::{ChatService, ChatServiceError};
pub use thread::{Delivery, MessageThread, ThreadEntry, ThreadMessage};
