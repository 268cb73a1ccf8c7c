//! Frame codecs.
//!
//! A codec turns the raw byte stream into discrete opaque payloads and back.
//! Codecs are swappable per transport instance; [`LengthPrefixCodec`] is the
//! default and the minimum wire contract other implementations should match
//! in spirit: framing only, no payload interpretation.

mod length_prefix;

pub use length_prefix::LengthPrefixCodec;

use bytes::Bytes;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Framing strategy plugged into a transport.
///
/// Implementors supply both directions of the frame boundary: decoding the
/// inbound stream into payloads and encoding outbound payloads. Each
/// connection gets its own clone, so decode state never crosses streams.
pub trait FrameCodec:
    Decoder<Item = Bytes, Error = CodecError>
    + Encoder<Bytes, Error = CodecError>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> FrameCodec for T where
    T: Decoder<Item = Bytes, Error = CodecError>
        + Encoder<Bytes, Error = CodecError>
        + Clone
        + Send
        + Sync
        + 'static
{
}
