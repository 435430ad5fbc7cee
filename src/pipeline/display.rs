//! Display agent: inbound queue to the terminal.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::Session;
use crate::error::Result;

use super::{teardown, AgentExit};

/// Prefix written before every received message.
pub const RECEIVED_LABEL: &[u8] = b"Recieved: ";

/// Print received messages, oldest first.
///
/// A message is removed from the queue only after it has been written,
/// which is what releases the receive agent's handoff wait. This agent
/// never stops by itself; the session cancels it.
pub async fn run<W>(session: Arc<Session>, mut out: W) -> Result<AgentExit>
where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let Some(message) = teardown(session.inbound().peek().await)? else {
            return Ok(AgentExit::Finished);
        };

        out.write_all(RECEIVED_LABEL).await?;
        out.write_all(message.as_bytes()).await?;
        out.flush().await?;

        if teardown(session.inbound().pop().await)?.is_none() {
            return Ok(AgentExit::Finished);
        }
    }
}
