//! Core module - messages, bounded queues and the chat session.
//!
//! This module contains the heart of s-talk's message handling:
//! - Message payloads and the end-of-chat sentinel
//! - Bounded LIFO/FIFO queues with blocking push and pop
//! - The session context and its shutdown coordinator

pub mod message;
pub mod queue;
pub mod session;

pub use message::{Message, MAX_MESSAGE_LEN, SENTINEL};
pub use queue::{BoundedQueue, QueueError, QueueOrder, DEFAULT_QUEUE_CAPACITY};
pub use session::{AgentKind, Session, SessionState, ShutdownOrigin};
