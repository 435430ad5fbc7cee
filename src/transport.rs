//! Datagram transport to the single remote peer.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};
use tokio_util::sync::CancellationToken;

use crate::core::message::{Message, MAX_MESSAGE_LEN};
use crate::error::{Error, Result};

/// Connectionless, bidirectional link to one peer.
///
/// The transmit agent only calls `send` and the receive agent only calls
/// `receive`, so implementations never see the two directions contend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message as one datagram.
    async fn send(&self, message: &Message) -> Result<()>;

    /// Wait for the next datagram and decode it.
    async fn receive(&self) -> Result<Message>;

    /// Fail pending and future calls with [`Error::TransportClosed`].
    fn close(&self);
}

/// UDP socket bound to a local port, addressed to one peer.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    closed: CancellationToken,
}

impl UdpTransport {
    /// Bind the local socket.
    pub async fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| Error::Setup(format!("Socket binding failed on {}: {}", local, e)))?;
        Ok(Self::from_socket(socket, peer))
    }

    pub fn from_socket(socket: UdpSocket, peer: SocketAddr) -> Self {
        Self {
            socket,
            peer,
            closed: CancellationToken::new(),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, message: &Message) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::TransportClosed);
        }

        let sent = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(Error::TransportClosed),
            result = self.socket.send_to(message.as_bytes(), self.peer) => result.map_err(|e| {
                Error::Transport(format!("Error sending message to {}: {}", self.peer, e))
            })?,
        };

        if sent != message.len() {
            return Err(Error::Transport(format!(
                "Short send to {}: {} of {} bytes",
                self.peer,
                sent,
                message.len()
            )));
        }

        tracing::trace!(peer = %self.peer, bytes = sent, "Datagram sent");
        Ok(())
    }

    async fn receive(&self) -> Result<Message> {
        let mut buf = [0u8; MAX_MESSAGE_LEN];

        let (len, from) = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(Error::TransportClosed),
            result = self.socket.recv_from(&mut buf) => result.map_err(|e| {
                Error::Transport(format!("Error receiving datagram: {}", e))
            })?,
        };

        if from != self.peer {
            tracing::warn!(%from, expected = %self.peer, "Datagram from unexpected source");
        }
        tracing::trace!(%from, bytes = len, "Datagram received");

        Ok(Message::from_datagram(&buf, len))
    }

    fn close(&self) {
        self.closed.cancel();
    }
}

/// Resolve the peer's address, preferring IPv4.
pub async fn resolve_peer(host: &str, port: u16) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| Error::Setup(format!("Getting remote address failed for {}: {}", host, e)))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| Error::Setup(format!("No address found for {}", host)))
}
