//! Peer abstraction.
//!
//! This module provides:
//! - The [`Peer`] capability trait the application layer sees
//! - Peer identification and metadata
//! - The TCP-backed peer handle

pub mod info;
pub mod tcp;

pub use info::{Direction, PeerInfo};
pub use tcp::{PeerCommand, TcpPeer};

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportResult;

/// Handle to one established connection to a remote node.
///
/// This is the full capability surface the layers above the transport get:
/// push bytes at the peer, tear the connection down, and ask where it came
/// from. Concrete transports supply their own implementations.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Remote address of the connection; the peer's registry identity.
    fn remote_addr(&self) -> SocketAddr;

    /// Direction of the connection.
    fn direction(&self) -> Direction;

    /// Whether this connection was locally dialed.
    fn is_outbound(&self) -> bool {
        self.direction() == Direction::Outbound
    }

    /// Queue a payload for delivery to the peer.
    ///
    /// Fails with [`crate::TransportError::ConnectionClosed`] once the peer
    /// has been closed or its connection has failed.
    async fn send(&self, payload: Bytes) -> TransportResult<()>;

    /// Close the connection.
    ///
    /// Idempotent: repeated calls succeed without releasing anything twice.
    /// The peer's read loop observes the close and exits.
    async fn close(&self) -> TransportResult<()>;
}
