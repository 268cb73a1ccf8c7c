//! Transport configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::handshake::{Handshake, NoopHandshake};

/// Maximum frame payload size in bytes (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Default timeout for establishing outbound connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for completing the handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the envelope delivery channel.
pub const DEFAULT_ENVELOPE_CAPACITY: usize = 1024;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for a transport instance.
///
/// Immutable once a transport is constructed.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Address to bind the listener to.
    pub bind_addr: SocketAddr,

    /// Negotiation strategy run once per new connection.
    pub handshake: Arc<dyn Handshake>,

    /// Timeout for establishing outbound connections.
    pub connect_timeout: Duration,

    /// Timeout for completing the handshake.
    pub handshake_timeout: Duration,

    /// Largest frame payload the codec will accept.
    pub max_frame_size: usize,

    /// Capacity of the envelope delivery channel.
    pub envelope_capacity: usize,

    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4044".parse().unwrap(),
            handshake: Arc::new(NoopHandshake),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
            envelope_capacity: DEFAULT_ENVELOPE_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl TransportConfig {
    /// Create a configuration with the specified bind address.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Set the handshake strategy.
    pub fn with_handshake(mut self, handshake: impl Handshake + 'static) -> Self {
        self.handshake = Arc::new(handshake);
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the maximum frame payload size.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the envelope channel capacity.
    pub fn with_envelope_capacity(mut self, capacity: usize) -> Self {
        self.envelope_capacity = capacity;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
