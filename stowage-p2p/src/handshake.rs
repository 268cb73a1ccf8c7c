//! Handshake negotiation strategies.
//!
//! A handshake runs exactly once per new connection, before the peer is
//! registered or any frame is delivered. It may read and write arbitrary
//! bytes on the raw stream; on success it must leave the stream positioned at
//! the first application frame. On failure the transport closes the
//! connection and the peer is never registered.

use std::fmt;

use async_trait::async_trait;
use bincode::Options;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::HandshakeError;
use crate::peer::PeerInfo;

/// Protocol version spoken by this build.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest hello frame a peer may send.
const MAX_HELLO_SIZE: usize = 1024;

/// Raw byte stream a handshake negotiates over, before framing begins.
pub trait Conn: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Conn for T {}

/// Negotiation strategy run once per new connection.
#[async_trait]
pub trait Handshake: Send + Sync + fmt::Debug {
    /// Negotiate with the remote side of `stream`.
    async fn negotiate(
        &self,
        stream: &mut dyn Conn,
        info: &PeerInfo,
    ) -> Result<(), HandshakeError>;
}

/// Handshake that admits every connection without touching the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandshake;

#[async_trait]
impl Handshake for NoopHandshake {
    async fn negotiate(
        &self,
        _stream: &mut dyn Conn,
        _info: &PeerInfo,
    ) -> Result<(), HandshakeError> {
        Ok(())
    }
}

/// Hello message exchanged by [`VersionHandshake`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Hello {
    /// Protocol version of the sender.
    protocol_version: u32,
    /// Free-form client identifier.
    user_agent: String,
}

/// Version handshake: both sides send one length-prefixed hello and validate
/// the peer's protocol version.
///
/// Hellos are serialized with deterministic bincode options (fixed-size
/// integers, little-endian, no trailing bytes) behind a 4-byte big-endian
/// length prefix, so a successful exchange ends exactly at the application
/// frame boundary.
#[derive(Debug, Clone)]
pub struct VersionHandshake {
    user_agent: String,
}

impl VersionHandshake {
    /// Create a handshake announcing `user_agent`.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for VersionHandshake {
    fn default() -> Self {
        Self::new(concat!("stowage-p2p/", env!("CARGO_PKG_VERSION")))
    }
}

#[async_trait]
impl Handshake for VersionHandshake {
    async fn negotiate(
        &self,
        stream: &mut dyn Conn,
        info: &PeerInfo,
    ) -> Result<(), HandshakeError> {
        let ours = Hello {
            protocol_version: PROTOCOL_VERSION,
            user_agent: self.user_agent.clone(),
        };

        write_hello(stream, &ours).await?;
        let theirs = read_hello(stream).await?;

        if theirs.protocol_version != PROTOCOL_VERSION {
            return Err(HandshakeError::IncompatibleVersion {
                peer_version: theirs.protocol_version,
                our_version: PROTOCOL_VERSION,
            });
        }

        tracing::debug!(
            addr = %info.addr,
            user_agent = %theirs.user_agent,
            "Version handshake complete"
        );

        Ok(())
    }
}

async fn write_hello(stream: &mut dyn Conn, hello: &Hello) -> Result<(), HandshakeError> {
    let body = encode_hello(hello)?;

    stream.write_all(&(body.len() as u32).to_be_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;

    Ok(())
}

async fn read_hello(stream: &mut dyn Conn) -> Result<Hello, HandshakeError> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let length = u32::from_be_bytes(header) as usize;
    if length > MAX_HELLO_SIZE {
        return Err(HandshakeError::Malformed(format!(
            "hello frame of {length} bytes"
        )));
    }

    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await?;

    decode_hello(&body)
}

/// Deterministic bincode options for hello frames.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn encode_hello(hello: &Hello) -> Result<Vec<u8>, HandshakeError> {
    options()
        .serialize(hello)
        .map_err(|e| HandshakeError::Malformed(e.to_string()))
}

fn decode_hello(bytes: &[u8]) -> Result<Hello, HandshakeError> {
    options()
        .deserialize(bytes)
        .map_err(|e| HandshakeError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Direction;

    fn test_info(port: u16, direction: Direction) -> PeerInfo {
        PeerInfo::new(format!("127.0.0.1:{port}").parse().unwrap(), direction)
    }

    #[test]
    fn test_hello_roundtrip() {
        let hello = Hello {
            protocol_version: PROTOCOL_VERSION,
            user_agent: "test/1.0".to_string(),
        };

        let bytes = encode_hello(&hello).unwrap();
        let recovered = decode_hello(&bytes).unwrap();

        assert_eq!(recovered, hello);
    }

    #[test]
    fn test_hello_rejects_trailing_bytes() {
        let hello = Hello {
            protocol_version: 1,
            user_agent: String::new(),
        };

        let mut bytes = encode_hello(&hello).unwrap();
        bytes.push(0xFF);

        assert!(matches!(
            decode_hello(&bytes),
            Err(HandshakeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_version_handshake_completes() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        let ha = VersionHandshake::new("a/1.0");
        let hb = VersionHandshake::new("b/1.0");
        let ia = test_info(1000, Direction::Outbound);
        let ib = test_info(2000, Direction::Inbound);

        let (ra, rb) = tokio::join!(ha.negotiate(&mut a, &ia), hb.negotiate(&mut b, &ib));
        ra.unwrap();
        rb.unwrap();
    }

    #[tokio::test]
    async fn test_version_handshake_rejects_garbage() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        // A frame that parses as a header but not as a hello.
        a.write_all(&8u32.to_be_bytes()).await.unwrap();
        a.write_all(&[0xFF; 8]).await.unwrap();

        let handshake = VersionHandshake::new("b/1.0");
        let info = test_info(2000, Direction::Inbound);

        let result = handshake.negotiate(&mut b, &info).await;
        assert!(matches!(result, Err(HandshakeError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_version_handshake_rejects_oversized_hello() {
        let (mut a, mut b) = tokio::io::duplex(64);

        let writer = async {
            a.write_all(&(MAX_HELLO_SIZE as u32 + 1).to_be_bytes())
                .await
                .unwrap();
        };

        let handshake = VersionHandshake::new("b/1.0");
        let info = test_info(2000, Direction::Inbound);
        let (_, result) = tokio::join!(writer, handshake.negotiate(&mut b, &info));

        assert!(matches!(result, Err(HandshakeError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_noop_handshake_leaves_stream_untouched() {
        let (mut a, mut b) = tokio::io::duplex(64);

        let info = test_info(1000, Direction::Outbound);
        NoopHandshake.negotiate(&mut a, &info).await.unwrap();

        // Bytes written before the handshake are still the first thing read.
        a.write_all(b"app").await.unwrap();
        let mut buf = [0u8; 3];
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"app");
    }
}
