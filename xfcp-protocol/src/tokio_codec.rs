//! Serial framing as a [`tokio_util::codec`] pair, for async transports
//! driven through `Framed`.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{error::FrameError, protocol::Frame};

/// Default bound on the stuffed interior of one serial frame.
const DEFAULT_MAX_FRAME_LEN: usize = 128 * 1024;

/// [`Decoder`]/[`Encoder`] for the COBS-delimited serial encoding.
///
/// Decoding applies the same recovery rule as
/// [`StreamParser`](crate::StreamParser): a chunk that fails COBS decoding or
/// datagram parsing is discarded and scanning continues at the next `0x00`
/// delimiter, so a corrupted or partial frame never stalls the stream.
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new(max_frame_len: usize) -> FrameCodec {
        FrameCodec { max_frame_len }
    }
}

impl Default for FrameCodec {
    fn default() -> FrameCodec {
        FrameCodec::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            let Some(delimiter) = src.iter().position(|&b| b == 0x00) else {
                if src.len() > self.max_frame_len {
                    // Unterminated oversized junk; drop it. If the cut lands
                    // inside a real frame its remainder fails to decode and
                    // the stream resynchronizes at the following delimiter.
                    src.clear();
                }
                return Ok(None);
            };
            let mut chunk = src.split_to(delimiter + 1);
            if chunk.len() == 1 {
                // Bare delimiter between frames.
                continue;
            }
            chunk.truncate(delimiter);
            match Frame::parse_cobs(&chunk) {
                Ok(frame) => return Ok(Some(frame)),
                Err(_) => continue,
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        dst.put_slice(&frame.to_cobs_bytes());
        Ok(())
    }
}
