//! Transport abstraction.
//!
//! A transport is the capability to listen for and establish peer
//! connections over some medium. Concrete bindings (TCP today) implement
//! [`Transport`] uniformly, so the layers above never name a medium.

pub mod tcp;

pub use tcp::TcpTransport;

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{TransportError, TransportResult};
use crate::peer::Peer;
use crate::registry::PeerRegistry;

/// Capability to listen for and establish peer connections.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind the listener and start the background accept loop.
    ///
    /// Returns immediately once the listener is bound; accepting runs on its
    /// own task until [`Transport::close`]. Fails with
    /// [`crate::TransportError::Bind`] if the address cannot be bound.
    async fn listen_and_accept(&self) -> TransportResult<()>;

    /// Establish an outbound connection to `addr`.
    ///
    /// Returns once the peer has completed its handshake and entered the
    /// registry.
    async fn dial(&self, addr: SocketAddr) -> TransportResult<()>;

    /// Address the listener is bound to, once listening.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// The registry of live peers.
    fn registry(&self) -> &PeerRegistry;

    /// Send a payload to the peer registered at `addr`.
    async fn send_to(&self, addr: SocketAddr, payload: Bytes) -> TransportResult<()> {
        match self.registry().get(&addr).await {
            Some(peer) => peer.send(payload).await,
            None => Err(TransportError::PeerNotFound { addr }),
        }
    }

    /// Send a payload to every live peer.
    ///
    /// Works from a snapshot of the registry; per-peer failures are logged
    /// and skipped, never propagated.
    async fn broadcast(&self, payload: Bytes) -> TransportResult<()> {
        for peer in self.registry().peers().await {
            if let Err(e) = peer.send(payload.clone()).await {
                tracing::debug!(
                    addr = %peer.remote_addr(),
                    error = %e,
                    "Failed to broadcast to peer"
                );
            }
        }
        Ok(())
    }

    /// Stop accepting new connections and disconnect all peers.
    async fn close(&self) -> TransportResult<()>;
}
