//! Length-prefixed frame codec.
//!
//! Frames are encoded as:
//! - 4 bytes: big-endian payload length
//! - N bytes: payload

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_FRAME_SIZE;
use crate::error::CodecError;

/// Length field size in bytes.
const HEADER_SIZE: usize = 4;

/// Decoder progress for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for a complete length header.
    Header,
    /// Header read; waiting for the full payload.
    Payload(usize),
    /// Discarding the remainder of an oversized frame.
    Skip(usize),
}

/// Codec for length-prefixed binary frames.
///
/// An advertised length above the maximum is reported once as
/// [`CodecError::FrameTooLarge`]; the codec then discards the oversized
/// payload and resumes at the next frame boundary, so callers may treat the
/// error as transient and keep decoding. Stream-level I/O errors, including a
/// partial frame at end of stream, are fatal.
#[derive(Debug, Clone)]
pub struct LengthPrefixCodec {
    state: DecodeState,
    max_frame_size: usize,
}

impl LengthPrefixCodec {
    /// Create a codec with the default maximum frame size.
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create a codec accepting payloads up to `max_frame_size` bytes.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            state: DecodeState::Header,
            max_frame_size,
        }
    }

    /// The largest payload this codec will accept.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for LengthPrefixCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LengthPrefixCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, CodecError> {
        loop {
            match self.state {
                DecodeState::Header => {
                    if src.len() < HEADER_SIZE {
                        return Ok(None);
                    }

                    let length = src.get_u32() as usize;

                    if length > self.max_frame_size {
                        self.state = DecodeState::Skip(length);
                        return Err(CodecError::FrameTooLarge {
                            size: length,
                            max: self.max_frame_size,
                        });
                    }

                    self.state = DecodeState::Payload(length);
                }
                DecodeState::Payload(length) => {
                    if src.len() < length {
                        // Reserve space for the full payload to avoid reallocations
                        src.reserve(length - src.len());
                        return Ok(None);
                    }

                    let payload = src.split_to(length).freeze();
                    self.state = DecodeState::Header;
                    return Ok(Some(payload));
                }
                DecodeState::Skip(remaining) => {
                    let discard = remaining.min(src.len());
                    src.advance(discard);

                    if discard < remaining {
                        self.state = DecodeState::Skip(remaining - discard);
                        return Ok(None);
                    }

                    self.state = DecodeState::Header;
                }
            }
        }
    }
}

impl Encoder<Bytes> for LengthPrefixCodec {
    type Error = CodecError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), CodecError> {
        let length = payload.len();

        if length > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        dst.reserve(HEADER_SIZE + length);
        dst.put_u32(length as u32);
        dst.put_slice(&payload);

        Ok(())
    }
}
