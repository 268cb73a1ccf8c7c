//! Peer identification and metadata.

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Direction of a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// We initiated the connection.
    Outbound,
    /// The peer connected to us.
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// Information about one peer connection.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// Remote socket address; identifies the peer in the registry.
    pub addr: SocketAddr,
    /// Direction of the connection.
    pub direction: Direction,
    /// When the raw connection was obtained.
    pub connected_at: Instant,
}

impl PeerInfo {
    /// Create info for a new connection.
    pub fn new(addr: SocketAddr, direction: Direction) -> Self {
        Self {
            addr,
            direction,
            connected_at: Instant::now(),
        }
    }

    /// Whether this connection was locally dialed.
    pub fn is_outbound(&self) -> bool {
        self.direction == Direction::Outbound
    }

    /// How long the connection has been up.
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.addr, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Outbound.to_string(), "outbound");
        assert_eq!(Direction::Inbound.to_string(), "inbound");
    }

    #[test]
    fn test_peer_info_new() {
        let info = PeerInfo::new("127.0.0.1:4044".parse().unwrap(), Direction::Inbound);

        assert_eq!(info.addr.port(), 4044);
        assert!(!info.is_outbound());
        assert_eq!(info.to_string(), "127.0.0.1:4044 (inbound)");
    }
}
