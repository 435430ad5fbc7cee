//! Chat pipeline - the four agents and the task runner that joins them.
//!
//! ```text
//! input -> outbound queue -> transmit -> transport ~~> peer
//! peer ~~> transport -> receive -> inbound queue -> display
//! ```
//!
//! Each agent runs as its own task. The runner races every agent against
//! its cancellation token, so the session can stop an agent wherever it is
//! waiting without that agent running any cleanup of its own.

pub mod display;
pub mod input;
pub mod receive;
pub mod transmit;

use std::future::Future;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::core::{AgentKind, QueueError, Session, ShutdownOrigin};
use crate::error::{Error, Result};
use crate::terminal::LineSource;

/// How an agent stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    /// Left its loop on its own.
    Finished,
    /// Saw the sentinel and won the race to end the chat.
    InitiatedShutdown,
    /// Stopped by the session.
    Cancelled,
}

/// Result of a completed chat.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub origin: Option<ShutdownOrigin>,
    pub exits: Vec<(AgentKind, AgentExit)>,
}

impl SessionReport {
    pub fn exit_of(&self, agent: AgentKind) -> Option<AgentExit> {
        self.exits
            .iter()
            .find(|(kind, _)| *kind == agent)
            .map(|(_, exit)| *exit)
    }
}

/// Run all four agents until the chat ends, then join them.
///
/// Returns the first fatal agent error, if any. The session is marked
/// terminated either way.
pub async fn run<L, W>(session: Arc<Session>, input: L, output: W) -> Result<SessionReport>
where
    L: LineSource + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let handles = [
        spawn_agent(&session, AgentKind::Input, input::run(Arc::clone(&session), input)),
        spawn_agent(&session, AgentKind::Transmit, transmit::run(Arc::clone(&session))),
        spawn_agent(&session, AgentKind::Receive, receive::run(Arc::clone(&session))),
        spawn_agent(&session, AgentKind::Display, display::run(Arc::clone(&session), output)),
    ];
    tracing::info!("Chat session started");

    let mut exits = Vec::with_capacity(handles.len());
    let mut failure = None;

    for (agent, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                session.abort(agent, &e.to_string());
                Err(Error::Agent {
                    agent: agent.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        match result {
            Ok(exit) => {
                tracing::info!(%agent, ?exit, "Agent exited");
                exits.push((agent, exit));
            }
            Err(e) => {
                tracing::error!(%agent, "Agent failed: {}", e);
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }
    }

    session.mark_terminated();

    match failure {
        Some(e) => Err(e),
        None => Ok(SessionReport {
            origin: session.shutdown_origin(),
            exits,
        }),
    }
}

fn spawn_agent<F>(
    session: &Arc<Session>,
    agent: AgentKind,
    body: F,
) -> (AgentKind, JoinHandle<Result<AgentExit>>)
where
    F: Future<Output = Result<AgentExit>> + Send + 'static,
{
    let token = session.token(agent);
    let session = Arc::clone(session);
    let span = tracing::info_span!("agent", name = %agent);

    let handle = tokio::spawn(
        async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Ok(AgentExit::Cancelled),
                result = body => result,
            };
            if let Err(e) = &result {
                session.abort(agent, &e.to_string());
            }
            result
        }
        .instrument(span),
    );

    (agent, handle)
}

/// Map errors caused by session teardown (closed queue or transport) to
/// `None`, so the agent can stop quietly. Other errors pass through.
pub(crate) fn teardown<T, E>(result: std::result::Result<T, E>) -> Result<Option<T>>
where
    E: Into<Error>,
{
    match result.map_err(Into::into) {
        Ok(value) => Ok(Some(value)),
        Err(Error::TransportClosed) | Err(Error::Queue(QueueError::Closed { .. })) => Ok(None),
        Err(e) => Err(e),
    }
}
