//! Decoded application frames.

use std::net::SocketAddr;

use bytes::Bytes;

/// One decoded frame together with the peer it came from.
///
/// The payload is opaque at this layer; interpreting it belongs to the
/// application above the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Remote address of the originating peer.
    pub from: SocketAddr,
    /// Raw frame payload.
    pub payload: Bytes,
}

impl Envelope {
    /// Create an envelope for a payload received from `from`.
    pub fn new(from: SocketAddr, payload: Bytes) -> Self {
        Self { from, payload }
    }
}
