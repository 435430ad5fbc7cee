//! s-talk library root.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod terminal;
pub mod transport;

pub use crate::cli::Commands;
pub use crate::config::{load_settings, Settings};
pub use crate::core::{BoundedQueue, Message, QueueOrder, Session, SessionState, ShutdownOrigin};
pub use crate::error::{Error, Result};
pub use crate::pipeline::{AgentExit, SessionReport};
pub use crate::transport::{Transport, UdpTransport};
