/// Wire encodings for [`Frame`]: the flat datagram layout and the
/// COBS-delimited serial layout built on top of it.
use std::io::{self, Write};

use crate::{
    error::FrameError,
    protocol::{Frame, MAX_PATH_LEN},
};

impl Frame {
    /// Writes the datagram encoding:
    /// `[op][path_len][path][rpath_len][rpath][payload]`.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&[self.op, self.path.len() as u8])?;
        writer.write_all(&self.path)?;
        writer.write_all(&[self.rpath.len() as u8])?;
        writer.write_all(&self.rpath)?;
        writer.write_all(&self.payload)
    }

    /// Returns the datagram encoding as an owned buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        buf.push(self.op);
        buf.push(self.path.len() as u8);
        buf.extend_from_slice(&self.path);
        buf.push(self.rpath.len() as u8);
        buf.extend_from_slice(&self.rpath);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parses a datagram-encoded frame.
    ///
    /// Fails if the buffer is shorter than the two length-prefixed sections
    /// declare, or if either section exceeds [`MAX_PATH_LEN`]. Everything
    /// after the return-path section is the payload.
    pub fn parse(buf: &[u8]) -> Result<Frame, FrameError> {
        if buf.len() < 3 {
            return Err(FrameError::Truncated {
                expected: 3,
                got: buf.len(),
            });
        }
        let op = buf[0];

        let path_len = buf[1] as usize;
        if path_len > MAX_PATH_LEN {
            return Err(FrameError::PathTooLong {
                max: MAX_PATH_LEN,
                got: path_len,
            });
        }
        let rpath_offset = 2 + path_len;
        if buf.len() < rpath_offset + 1 {
            return Err(FrameError::Truncated {
                expected: rpath_offset + 1,
                got: buf.len(),
            });
        }
        let path = buf[2..rpath_offset].to_vec();

        let rpath_len = buf[rpath_offset] as usize;
        if rpath_len > MAX_PATH_LEN {
            return Err(FrameError::PathTooLong {
                max: MAX_PATH_LEN,
                got: rpath_len,
            });
        }
        let payload_offset = rpath_offset + 1 + rpath_len;
        if buf.len() < payload_offset {
            return Err(FrameError::Truncated {
                expected: payload_offset,
                got: buf.len(),
            });
        }
        let rpath = buf[rpath_offset + 1..payload_offset].to_vec();
        let payload = buf[payload_offset..].to_vec();

        Ok(Frame {
            op,
            path,
            rpath,
            payload,
        })
    }

    /// Returns the serial encoding: COBS-stuffed datagram bytes followed by a
    /// single `0x00` delimiter. The stuffed interior contains no zero bytes,
    /// so a receiver can resynchronize on any delimiter.
    pub fn to_cobs_bytes(&self) -> Vec<u8> {
        let mut encoded = cobs::encode_vec(&self.to_bytes());
        encoded.push(0x00);
        encoded
    }

    /// Parses one serially encoded frame. The trailing delimiter is optional;
    /// the interior must not contain zero bytes.
    pub fn parse_cobs(buf: &[u8]) -> Result<Frame, FrameError> {
        let interior = match buf.split_last() {
            Some((&0x00, interior)) => interior,
            _ => buf,
        };
        let mut interior = interior.to_vec();
        let decoded_len =
            cobs::decode_in_place(&mut interior).map_err(|_| FrameError::InvalidCobs)?;
        Frame::parse(&interior[..decoded_len])
    }
}

/// Incremental parser for the serial encoding.
///
/// Feed it arbitrary chunks of a byte stream; it splits on `0x00` delimiters,
/// COBS-decodes each interior and yields every frame that parses. Anything
/// else (a bad COBS interior, a truncated datagram inside, an interior longer
/// than the configured bound) is discarded up to and including the next
/// delimiter, after which framing resumes. The parser never fails and never
/// blocks on garbage input.
#[derive(Debug)]
pub struct StreamParser {
    buf: Vec<u8>,
    max_len: usize,
    overflowed: bool,
}

impl StreamParser {
    /// Creates a parser that accumulates at most `max_len` bytes of stuffed
    /// interior per frame before entering discard mode.
    pub fn new(max_len: usize) -> StreamParser {
        StreamParser {
            buf: Vec::new(),
            max_len,
            overflowed: false,
        }
    }

    /// Feeds a chunk of stream bytes, returning the frames completed by it.
    pub fn push(&mut self, input: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        for &byte in input {
            if byte == 0x00 {
                if self.overflowed {
                    // The delimiter ends the oversized frame; framing is
                    // clean again from the next byte.
                    self.overflowed = false;
                } else if !self.buf.is_empty() {
                    if let Ok(decoded_len) = cobs::decode_in_place(&mut self.buf) {
                        if let Ok(frame) = Frame::parse(&self.buf[..decoded_len]) {
                            frames.push(frame);
                        }
                    }
                }
                self.buf.clear();
            } else if self.overflowed {
                // Discarding until the next delimiter.
            } else if self.buf.len() == self.max_len {
                self.buf.clear();
                self.overflowed = true;
            } else {
                self.buf.push(byte);
            }
        }
        frames
    }
}
