//! # XFCP Protocol Library
//!
//! This crate provides a Rust implementation of the XFCP control protocol,
//! a small source-routed request/response protocol for reaching
//! register-mapped hardware endpoints (control/status registers, PHY
//! configuration blocks) through a tree of switching fabrics.
//!
//! ## Overview
//!
//! A host sends command frames over a byte-serial link (UART) or a packet
//! link (UDP); each frame carries the downstream route to its target as an
//! explicit list of switch port indices. This library implements the frame
//! model and both wire encodings, allowing you to:
//!
//! - Build enumerate / read / write request frames and their responses
//! - Serialize and deserialize frames in the flat datagram encoding
//! - Frame byte streams with COBS stuffing and recover from line noise
//!
//! ## Frame Format
//!
//! The datagram encoding is
//! `[op:1][path_len:1][path][rpath_len:1][rpath][payload]`; the serial
//! encoding wraps those bytes in COBS and terminates them with a single
//! `0x00` delimiter. Operation codes:
//!
//! - `0xFE` / `0xFF`: enumerate request / response
//! - `0x10` / `0x11`: read request / response (`addr:1`, `len:2` LE)
//! - `0x12` / `0x13`: write request / acknowledgement
//! - `0xE0` / `0xE1`: routing and out-of-range error responses
//!
//! ## Basic Usage
//!
//! ### Encoding a Request
//!
//! ```
//! use xfcp_protocol::Frame;
//!
//! // Read four bytes at register address 0 from the endpoint behind port 0.
//! let frame = Frame::read_request(vec![0], 0x00, 4);
//! assert_eq!(frame.to_bytes(), vec![0x10, 1, 0, 0, 0x00, 0x04, 0x00]);
//! ```
//!
//! ### Serial Framing
//!
//! ```
//! use xfcp_protocol::Frame;
//!
//! let frame = Frame::enumerate_request(vec![]);
//! // COBS-stuffed interior plus the 0x00 delimiter.
//! assert_eq!(frame.to_cobs_bytes(), vec![0x02, 0xFE, 0x01, 0x01, 0x00]);
//! ```
//!
//! ### Recovering Frames from a Noisy Stream
//!
//! ```
//! use xfcp_protocol::{Frame, StreamParser};
//!
//! let mut parser = StreamParser::new(1024);
//! let mut stream = vec![0x17, 0x2A, 0x00]; // line noise, then a delimiter
//! stream.extend_from_slice(&Frame::enumerate_request(vec![1]).to_cobs_bytes());
//!
//! let frames = parser.push(&stream);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].path, vec![1]);
//! ```
//!
//! ## Error Handling
//!
//! Decoding uses the [`error::FrameError`] type. A malformed frame never
//! produces a protocol response; serial receivers discard through the next
//! delimiter and resume framing.
//!
//! ## Thread Safety
//!
//! The types in this library are thread-safe and can be safely shared across
//! threads. A [`StreamParser`] holds per-stream state and belongs to exactly
//! one receive loop.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub use codec::StreamParser;
pub mod error;
#[cfg(feature = "tokio")]
pub mod tokio_codec;
