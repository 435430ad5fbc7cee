//! Transmit agent: outbound queue to the peer.

use std::sync::Arc;

use crate::core::{Session, ShutdownOrigin};
use crate::error::Result;

use super::{teardown, AgentExit};

/// Send queued messages; sending the sentinel ends the chat locally.
pub async fn run(session: Arc<Session>) -> Result<AgentExit> {
    loop {
        let Some(message) = teardown(session.outbound().pop().await)? else {
            return Ok(AgentExit::Finished);
        };

        // flag set but queues not yet released by the shutdown winner
        if session.is_ending() {
            tracing::debug!("Session ending, discarding outbound message");
            return Ok(AgentExit::Finished);
        }

        if teardown(session.transport().send(&message).await)?.is_none() {
            return Ok(AgentExit::Finished);
        }
        tracing::debug!(bytes = message.len(), "Message sent");

        if message.is_sentinel() {
            return Ok(if session.begin_shutdown(ShutdownOrigin::Local) {
                AgentExit::InitiatedShutdown
            } else {
                AgentExit::Finished
            });
        }
    }
}
