//! Transport lifecycle events.
//!
//! Per-connection failures are never escalated past the connection they
//! belong to; the application reacts to these events (or simply observes a
//! peer vanishing from the registry).

use std::fmt;
use std::net::SocketAddr;

use crate::peer::Direction;

/// Why a peer connection was torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Remote side closed the stream.
    StreamEnded,
    /// The stream failed mid-read or mid-write.
    Io(String),
    /// `Peer::close` or transport shutdown.
    Requested,
    /// The application dropped its envelope receiver.
    ReceiverDropped,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::StreamEnded => write!(f, "stream ended"),
            DisconnectReason::Io(e) => write!(f, "I/O error: {e}"),
            DisconnectReason::Requested => write!(f, "close requested"),
            DisconnectReason::ReceiverDropped => write!(f, "envelope receiver dropped"),
        }
    }
}

/// Events surfaced to the application layer.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A peer completed its handshake and entered the registry.
    PeerConnected {
        addr: SocketAddr,
        direction: Direction,
    },
    /// A peer left the registry.
    PeerDisconnected {
        addr: SocketAddr,
        reason: DisconnectReason,
    },
    /// A connection failed negotiation and was dropped before registration.
    HandshakeFailed { addr: SocketAddr, reason: String },
    /// A transient decode error; the offending frame was skipped.
    FrameSkipped { addr: SocketAddr, reason: String },
}
