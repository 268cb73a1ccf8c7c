//! TCP-backed peer handle.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{TransportError, TransportResult};
use crate::peer::{Direction, Peer, PeerInfo};

/// Commands from peer handles to the owning connection task.
#[derive(Debug)]
pub enum PeerCommand {
    /// Encode and write a payload to the peer.
    Send(Bytes),
    /// Terminate the connection task.
    Disconnect,
}

/// Handle to a peer connected over TCP.
///
/// The handle does not own the socket; the connection task does. Commands
/// travel over an unbounded channel so `send` never blocks on a slow peer's
/// socket.
#[derive(Debug)]
pub struct TcpPeer {
    info: PeerInfo,
    commands: mpsc::UnboundedSender<PeerCommand>,
    closed: AtomicBool,
}

impl TcpPeer {
    /// Create a handle wired to a connection task's command channel.
    pub(crate) fn new(info: PeerInfo, commands: mpsc::UnboundedSender<PeerCommand>) -> Self {
        Self {
            info,
            commands,
            closed: AtomicBool::new(false),
        }
    }

    /// Metadata for this connection.
    pub fn info(&self) -> &PeerInfo {
        &self.info
    }

    /// Mark the handle closed without sending a command.
    ///
    /// Called by the connection task when the stream itself goes away, so
    /// later `send` calls fail fast.
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Peer for TcpPeer {
    fn remote_addr(&self) -> SocketAddr {
        self.info.addr
    }

    fn direction(&self) -> Direction {
        self.info.direction
    }

    async fn send(&self, payload: Bytes) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        self.commands
            .send(PeerCommand::Send(payload))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // The task may already be gone after an I/O error; close stays Ok.
        let _ = self.commands.send(PeerCommand::Disconnect);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_peer() -> (TcpPeer, mpsc::UnboundedReceiver<PeerCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let info = PeerInfo::new("127.0.0.1:4044".parse().unwrap(), Direction::Outbound);
        (TcpPeer::new(info, tx), rx)
    }

    #[tokio::test]
    async fn test_send_queues_command() {
        let (peer, mut rx) = make_peer();

        peer.send(Bytes::from_static(b"data")).await.unwrap();

        match rx.recv().await.unwrap() {
            PeerCommand::Send(payload) => assert_eq!(payload.as_ref(), b"data"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (peer, mut rx) = make_peer();

        peer.close().await.unwrap();
        peer.close().await.unwrap();

        // Exactly one disconnect command was issued.
        assert!(matches!(rx.recv().await, Some(PeerCommand::Disconnect)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (peer, _rx) = make_peer();

        peer.close().await.unwrap();

        let result = peer.send(Bytes::from_static(b"late")).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_send_after_task_exit_fails() {
        let (peer, rx) = make_peer();
        drop(rx);

        let result = peer.send(Bytes::from_static(b"orphan")).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }
}
