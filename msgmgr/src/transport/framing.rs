// Layer 1: Standard library imports
use std::io;

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

// Layer 3: Internal module imports
use crate::buffer::MAX_MESSAGE_LENGTH;

/// A frame's payload must at least carry the 2-byte message id.
const MIN_PAYLOAD_LENGTH: usize = 2;

/// Codec for `[u16 len][payload]` frames (length in network order).
///
/// Decoding yields the payload bytes (message id onward). A claimed length
/// outside `2..=MAX_MESSAGE_LENGTH` is unrecoverable on a stream: the
/// decoder returns an error and the peer connection is reset by the
/// reactor.
///
/// # Example
///
/// ```rust
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
///
/// use msgmgr::transport::FrameCodec;
///
/// let mut codec = FrameCodec::new();
/// let mut wire = BytesMut::new();
/// codec.encode(b"\x00\x05payload".as_ref(), &mut wire).unwrap();
///
/// let frame = codec.decode(&mut wire).unwrap().unwrap();
/// assert_eq!(&frame[..], b"\x00\x05payload");
/// ```
#[derive(Debug, Default)]
pub struct FrameCodec {
    _private: (),
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, io::Error> {
        if src.len() < 2 {
            return Ok(None);
        }

        let claimed = u16::from_be_bytes([src[0], src[1]]) as usize;
        if !(MIN_PAYLOAD_LENGTH..=MAX_MESSAGE_LENGTH).contains(&claimed) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("impossible frame length {claimed}"),
            ));
        }

        if src.len() < 2 + claimed {
            // Partial read; wait for the rest of the frame.
            src.reserve(2 + claimed - src.len());
            return Ok(None);
        }

        src.advance(2);
        Ok(Some(src.split_to(claimed)))
    }
}

impl<'a> Encoder<&'a [u8]> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), io::Error> {
        if !(MIN_PAYLOAD_LENGTH..=MAX_MESSAGE_LENGTH).contains(&payload.len()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload length {} outside frame bounds", payload.len()),
            ));
        }
        dst.reserve(2 + payload.len());
        dst.put_u16(payload.len() as u16);
        dst.extend_from_slice(payload);
        Ok(())
    }
}
