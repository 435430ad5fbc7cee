//! Chat session context and shutdown coordinator.
//!
//! One `Session` is shared (behind an `Arc`) by the four pipeline agents.
//! It owns the end-of-chat flag, both queues, the transport handle and one
//! cancellation token per agent. Whichever agent first sees the sentinel
//! calls [`Session::begin_shutdown`]; that call alone cancels the other
//! agents and releases the shared resources.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio_util::sync::CancellationToken;

use super::message::Message;
use super::queue::{BoundedQueue, QueueOrder};
use crate::transport::Transport;

/// The four pipeline agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Input,
    Transmit,
    Receive,
    Display,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Input,
        AgentKind::Transmit,
        AgentKind::Receive,
        AgentKind::Display,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Input => "input",
            AgentKind::Transmit => "transmit",
            AgentKind::Receive => "receive",
            AgentKind::Display => "display",
        }
    }

    fn index(self) -> usize {
        match self {
            AgentKind::Input => 0,
            AgentKind::Transmit => 1,
            AgentKind::Receive => 2,
            AgentKind::Display => 3,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side ended the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOrigin {
    /// The local user sent the sentinel.
    Local,
    /// The peer sent the sentinel.
    Remote,
}

impl ShutdownOrigin {
    /// Agents the initiator cancels. The initiator itself stops on its own,
    /// and on the local path the input agent has already stopped after
    /// reading the sentinel.
    pub fn targets(self) -> &'static [AgentKind] {
        match self {
            ShutdownOrigin::Local => &[AgentKind::Receive, AgentKind::Display],
            ShutdownOrigin::Remote => &[AgentKind::Input, AgentKind::Transmit, AgentKind::Display],
        }
    }
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    LocalShutdown,
    RemoteShutdown,
    /// A fatal agent error tore the session down.
    Aborted,
    Terminated,
}

impl From<ShutdownOrigin> for SessionState {
    fn from(origin: ShutdownOrigin) -> Self {
        match origin {
            ShutdownOrigin::Local => SessionState::LocalShutdown,
            ShutdownOrigin::Remote => SessionState::RemoteShutdown,
        }
    }
}

/// Shared state of one chat session.
pub struct Session {
    end_chat: AtomicBool,
    state: Mutex<SessionState>,
    origin: OnceLock<ShutdownOrigin>,
    outbound: BoundedQueue<Message>,
    inbound: BoundedQueue<Message>,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    agents: [CancellationToken; 4],
    released: AtomicBool,
}

impl Session {
    /// Create a session whose queues each hold `queue_capacity` messages.
    pub fn new(transport: Arc<dyn Transport>, queue_capacity: usize) -> Self {
        let cancel = CancellationToken::new();
        let agents = [
            cancel.child_token(),
            cancel.child_token(),
            cancel.child_token(),
            cancel.child_token(),
        ];

        Self {
            end_chat: AtomicBool::new(false),
            state: Mutex::new(SessionState::Running),
            origin: OnceLock::new(),
            outbound: BoundedQueue::new("outbound", QueueOrder::Lifo, queue_capacity),
            inbound: BoundedQueue::new("inbound", QueueOrder::Fifo, queue_capacity),
            transport,
            cancel,
            agents,
            released: AtomicBool::new(false),
        }
    }

    /// Queue from the input agent to the transmit agent.
    pub fn outbound(&self) -> &BoundedQueue<Message> {
        &self.outbound
    }

    /// Queue from the receive agent to the display agent.
    pub fn inbound(&self) -> &BoundedQueue<Message> {
        &self.inbound
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Whether the end-of-chat flag is set.
    pub fn is_ending(&self) -> bool {
        self.end_chat.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    pub fn shutdown_origin(&self) -> Option<ShutdownOrigin> {
        self.origin.get().copied()
    }

    /// Cancellation token of one agent.
    pub fn token(&self, agent: AgentKind) -> CancellationToken {
        self.agents[agent.index()].clone()
    }

    /// End the chat. Returns `false` if another agent already did.
    ///
    /// The winner sets the flag, cancels the origin's target agents and
    /// releases the queues and transport.
    pub fn begin_shutdown(&self, origin: ShutdownOrigin) -> bool {
        if self
            .end_chat
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(?origin, "Shutdown already in progress");
            return false;
        }

        let _ = self.origin.set(origin);
        *self.lock_state() = origin.into();
        tracing::info!(?origin, "Terminating......");

        for agent in origin.targets() {
            self.agents[agent.index()].cancel();
            tracing::info!(%agent, "Agent cancelled");
        }

        self.release();
        true
    }

    /// Tear the session down after a fatal agent error.
    pub fn abort(&self, agent: AgentKind, reason: &str) {
        self.end_chat.store(true, Ordering::Release);
        {
            let mut state = self.lock_state();
            if *state == SessionState::Running {
                *state = SessionState::Aborted;
            }
        }
        tracing::error!(%agent, reason, "Agent failed, aborting session");

        self.cancel.cancel();
        self.release();
    }

    /// Record that every agent has been joined.
    pub fn mark_terminated(&self) {
        *self.lock_state() = SessionState::Terminated;
        self.release();
        tracing::debug!("Session terminated");
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        let outbound = self.outbound.close();
        let inbound = self.inbound.close();
        self.transport.close();
        tracing::debug!(
            discarded_outbound = outbound,
            discarded_inbound = inbound,
            "Session resources released"
        );
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{self, MemoryTransport};

    fn session() -> (Arc<Session>, Arc<MemoryTransport>) {
        let (local, _peer) = memory::pair();
        let local = Arc::new(local);
        let session = Session::new(local.clone(), 4);
        (Arc::new(session), local)
    }

    #[test]
    fn test_new_session_is_running() {
        let (session, _) = session();
        assert_eq!(session.state(), SessionState::Running);
        assert!(!session.is_ending());
        assert_eq!(session.shutdown_origin(), None);
        assert_eq!(session.outbound().order(), QueueOrder::Lifo);
        assert_eq!(session.inbound().order(), QueueOrder::Fifo);
        assert_eq!(session.outbound().capacity(), 4);
    }

    #[test]
    fn test_local_shutdown_cancels_receive_and_display() {
        let (session, transport) = session();

        assert!(session.begin_shutdown(ShutdownOrigin::Local));
        assert!(session.is_ending());
        assert_eq!(session.state(), SessionState::LocalShutdown);
        assert_eq!(session.shutdown_origin(), Some(ShutdownOrigin::Local));

        assert!(session.token(AgentKind::Receive).is_cancelled());
        assert!(session.token(AgentKind::Display).is_cancelled());
        assert!(!session.token(AgentKind::Input).is_cancelled());
        assert!(!session.token(AgentKind::Transmit).is_cancelled());

        assert!(session.outbound().is_closed());
        assert!(session.inbound().is_closed());
        assert!(transport.is_closed());
    }

    #[test]
    fn test_remote_shutdown_cancels_other_three() {
        let (session, _) = session();

        assert!(session.begin_shutdown(ShutdownOrigin::Remote));
        assert_eq!(session.state(), SessionState::RemoteShutdown);

        assert!(session.token(AgentKind::Input).is_cancelled());
        assert!(session.token(AgentKind::Transmit).is_cancelled());
        assert!(session.token(AgentKind::Display).is_cancelled());
        assert!(!session.token(AgentKind::Receive).is_cancelled());
    }

    #[test]
    fn test_only_first_shutdown_wins() {
        let (session, _) = session();

        assert!(session.begin_shutdown(ShutdownOrigin::Remote));
        assert!(!session.begin_shutdown(ShutdownOrigin::Local));
        assert!(!session.begin_shutdown(ShutdownOrigin::Remote));

        assert_eq!(session.state(), SessionState::RemoteShutdown);
        assert_eq!(session.shutdown_origin(), Some(ShutdownOrigin::Remote));
        // the losing local path never cancels the receive agent
        assert!(!session.token(AgentKind::Receive).is_cancelled());
    }

    #[test]
    fn test_concurrent_shutdown_has_single_winner() {
        let (session, _) = session();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    let origin = if i % 2 == 0 {
                        ShutdownOrigin::Local
                    } else {
                        ShutdownOrigin::Remote
                    };
                    session.begin_shutdown(origin)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_abort_cancels_everyone() {
        let (session, transport) = session();

        session.abort(AgentKind::Receive, "socket error");
        assert!(session.is_ending());
        assert_eq!(session.state(), SessionState::Aborted);
        for agent in AgentKind::ALL {
            assert!(session.token(agent).is_cancelled());
        }
        assert!(transport.is_closed());

        session.mark_terminated();
        assert_eq!(session.state(), SessionState::Terminated);
    }
}
