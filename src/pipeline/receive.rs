//! Receive agent: datagrams from the peer onto the inbound queue.

use std::sync::Arc;

use crate::core::{Session, ShutdownOrigin};
use crate::error::Result;

use super::{teardown, AgentExit};

/// Receive datagrams and hand each one to the display agent.
///
/// The next datagram is not fetched until the display agent has taken the
/// previous one, so at most one inbound message is ever buffered. A full
/// inbound queue therefore means the display agent stalled, which is fatal.
/// Receiving the sentinel ends the chat from the remote side.
pub async fn run(session: Arc<Session>) -> Result<AgentExit> {
    loop {
        let Some(message) = teardown(session.transport().receive().await)? else {
            return Ok(AgentExit::Finished);
        };

        // flag set but transport not yet closed by the shutdown winner
        if session.is_ending() {
            return Ok(AgentExit::Finished);
        }

        let sentinel = message.is_sentinel();
        tracing::debug!(bytes = message.len(), "Message received");

        if teardown(session.inbound().try_push(message))?.is_none() {
            return Ok(AgentExit::Finished);
        }
        // handoff: wait for the display agent to take it
        if teardown(session.inbound().wait_until_empty().await)?.is_none() {
            return Ok(AgentExit::Finished);
        }

        if sentinel {
            return Ok(if session.begin_shutdown(ShutdownOrigin::Remote) {
                AgentExit::InitiatedShutdown
            } else {
                AgentExit::Finished
            });
        }
    }
}
