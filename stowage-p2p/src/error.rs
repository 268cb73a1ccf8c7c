//! Transport error types.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors produced by a frame codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Underlying stream failure. Always fatal to the read loop.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Advertised frame length exceeds the configured maximum.
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },
}

impl CodecError {
    /// Whether the error invalidates the stream itself.
    ///
    /// Non-fatal errors apply to a single frame; the codec is left positioned
    /// at the next frame boundary and decoding may continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CodecError::Io(_))
    }
}

/// Errors produced by handshake negotiation.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// I/O failure while negotiating.
    #[error("I/O error during handshake: {0}")]
    Io(#[from] io::Error),

    /// Peer speaks a protocol version we cannot talk to.
    #[error("incompatible protocol version: {peer_version} (our version: {our_version})")]
    IncompatibleVersion { peer_version: u32, our_version: u32 },

    /// Peer sent bytes that do not parse as a handshake message.
    #[error("malformed handshake message: {0}")]
    Malformed(String),

    /// Negotiation strategy refused the connection.
    #[error("handshake rejected: {0}")]
    Rejected(String),
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Listener could not be created. Fatal to `listen_and_accept`.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// `listen_and_accept` was called on a transport that already listens.
    #[error("transport is already listening")]
    AlreadyListening,

    /// I/O error during a transport operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Outbound connection attempt timed out.
    #[error("connection timeout to {addr}")]
    ConnectTimeout { addr: SocketAddr },

    /// Handshake did not complete within the configured timeout.
    #[error("handshake timeout")]
    HandshakeTimeout,

    /// Handshake negotiation failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Frame codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Send or close on a peer whose connection has already gone away.
    #[error("connection closed")]
    ConnectionClosed,

    /// A live connection to this address already exists.
    #[error("already connected to peer: {addr}")]
    AlreadyConnected { addr: SocketAddr },

    /// No registered peer at this address.
    #[error("peer not found: {addr}")]
    PeerNotFound { addr: SocketAddr },
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_codec_errors_are_fatal() {
        let err = CodecError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(err.is_fatal());

        let err = CodecError::FrameTooLarge { size: 10, max: 5 };
        assert!(!err.is_fatal());
    }

    #[test]
    fn handshake_error_converts_to_transport_error() {
        let err: TransportError = HandshakeError::Rejected("bad genesis".to_string()).into();
        assert!(matches!(err, TransportError::Handshake(_)));
    }
}
