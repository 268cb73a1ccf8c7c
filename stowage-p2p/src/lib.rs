//! Pluggable peer-to-peer transport for the stowage node.
//!
//! This crate is the networking core of a peer-to-peer file-sharing node: it
//! establishes connections to remote peers, runs a negotiable handshake on
//! every new connection, frames and decodes application messages, and tracks
//! the set of currently connected peers. Everything above the raw frame
//! (storage, content addressing, discovery, routing) belongs to higher
//! layers.
//!
//! # Architecture
//!
//! The transport uses a task-per-connection architecture; coordination
//! between components is handled via channels.
//!
//! ```text
//! TcpTransport
//! ├── Accept Loop Task (bind + accept inbound)
//! ├── Peer Task 1 (handshake → framed read/write loop)
//! ├── Peer Task 2 (handshake → framed read/write loop)
//! └── PeerRegistry (one RwLock: addr → live peer)
//!          │
//!          ▼ envelopes / events (mpsc)
//!     application layer
//! ```
//!
//! The pluggable seams are [`Handshake`] (admission), [`FrameCodec`]
//! (framing), and [`Transport`]/[`Peer`] (medium). TCP is the only binding
//! today; other stream media implement the same traits without touching the
//! core.
//!
//! # Usage
//!
//! ```ignore
//! use stowage_p2p::{TcpTransport, Transport, TransportConfig};
//!
//! let config = TransportConfig::new("127.0.0.1:4044".parse().unwrap());
//! let mut transport = TcpTransport::new(config);
//! let mut envelopes = transport.envelope_receiver();
//! transport.listen_and_accept().await?;
//!
//! while let Some(envelope) = envelopes.recv().await {
//!     println!("{} sent {} bytes", envelope.from, envelope.payload.len());
//! }
//! ```

pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod event;
pub mod handshake;
pub mod peer;
pub mod registry;
pub mod transport;

// Re-export main types
pub use codec::{FrameCodec, LengthPrefixCodec};
pub use config::{TransportConfig, MAX_FRAME_SIZE};
pub use envelope::Envelope;
pub use error::{CodecError, HandshakeError, TransportError, TransportResult};
pub use event::{DisconnectReason, TransportEvent};
pub use handshake::{Conn, Handshake, NoopHandshake, VersionHandshake, PROTOCOL_VERSION};
pub use peer::{Direction, Peer, PeerInfo, TcpPeer};
pub use registry::PeerRegistry;
pub use transport::{TcpTransport, Transport};
