//! Error types for s-talk.

use thiserror::Error;

use crate::core::queue::QueueError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Message error: {0}")]
    Message(String),

    #[error("Agent {agent} failed: {reason}")]
    Agent { agent: String, reason: String },

    #[error("{0}")]
    Other(String),
}
