//! Input agent: terminal lines onto the outbound queue.

use std::sync::Arc;

use crate::core::{Message, Session, MAX_MESSAGE_LEN};
use crate::error::Result;
use crate::terminal::LineSource;

use super::{teardown, AgentExit};

/// Read lines and queue them for sending until the sentinel is typed.
///
/// Lines longer than [`MAX_MESSAGE_LEN`] are sent as several messages.
/// End of input stops this agent only; the session keeps running.
pub async fn run<L>(session: Arc<Session>, mut source: L) -> Result<AgentExit>
where
    L: LineSource,
{
    loop {
        let Some(line) = source.next_line().await? else {
            tracing::info!("End of terminal input");
            return Ok(AgentExit::Finished);
        };

        for chunk in line.chunks(MAX_MESSAGE_LEN) {
            let message = Message::new(chunk)?;
            let sentinel = message.is_sentinel();

            if teardown(session.outbound().push(message).await)?.is_none() {
                return Ok(AgentExit::Finished);
            }
            tracing::trace!(bytes = chunk.len(), "Queued outbound message");

            if session.is_ending() || sentinel {
                return Ok(AgentExit::Finished);
            }
        }
    }
}
