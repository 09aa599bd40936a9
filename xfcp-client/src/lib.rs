//! # XFCP Client
//!
//! A Rust client library for connecting to XFCP fabrics and performing
//! remote register operations on the endpoints behind them.
//!
//! ## Overview
//!
//! This crate provides a high-level host-side interface to XFCP nodes over
//! either transport: a UDP socket or any serial byte stream. It handles
//! frame construction, path routing and response matching, and provides
//! convenient methods for discovery and register access.
//!
//! ## Addressing
//!
//! Every operation takes a `path`: the list of switch port indices from the
//! attachment point down to the target node. The empty path addresses the
//! node the transport is attached to. Discovery is a host-driven walk: read
//! the root descriptor, then enumerate each port it reports, and so on.
//!
//! ## Basic Usage
//!
//! ### Connecting and Discovering
//!
//! ```ignore
//! use xfcp_client::XfcpClient;
//!
//! let mut client = XfcpClient::connect("192.168.1.128:1234")?;
//!
//! // Descriptor of the root switch, then of the node behind port 0.
//! let root = client.enumerate(&[])?;
//! let leaf = client.enumerate(&[0])?;
//! ```
//!
//! ### Register Access
//!
//! ```ignore
//! // Four raw bytes at address 0 of the endpoint behind port 0.
//! client.write(&[0], 0x00, &0x1122_3344u32.to_le_bytes())?;
//! let bytes = client.read(&[0], 0x00, 4)?;
//!
//! // Word and field-level access.
//! let word = client.read_word(&[0], 0x00)?;
//! client.write_masked(&[0], 0x00, 0x0000_0040, 0x0000_00C0)?;
//! ```
//!
//! ## Serial Links
//!
//! ```ignore
//! let port = std::fs::OpenOptions::new().read(true).write(true).open("/dev/ttyUSB0")?;
//! let mut client = XfcpClient::over_stream(port);
//! let root = client.enumerate(&[])?;
//! ```
//!
//! ## Error Handling
//!
//! Fabric-reported failures (routing errors, out-of-range accesses) surface
//! as typed [`error::ClientError`] variants carrying the echoed diagnostics.
//! The protocol has no timeout of its own; requests that never reach an
//! endpoint never produce a response, so UDP callers should set a socket
//! timeout via [`XfcpClient::set_timeout`] and retry at their own policy.
pub mod error;
pub mod regmap;

use std::io::{Read, Write};
use std::net::{Ipv4Addr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use error::ClientError;
use regmap::Field;
use xfcp_protocol::{Frame, StreamParser, op};

/// Largest response the client will accept.
const MAX_FRAME_LEN: usize = 128 * 1024;

/// Anything that can carry the serial encoding: a UART device node, a PTY,
/// a TCP byte pipe.
pub trait ByteStream: Read + Write {}
impl<T: Read + Write> ByteStream for T {}

enum Link {
    Udp(UdpSocket),
    Stream {
        stream: Box<dyn ByteStream>,
        parser: StreamParser,
    },
}

/// XFCP client for remote register operations.
///
/// One client owns one transport attachment. Requests are strictly
/// serialized: each call sends one frame and blocks until its response (or a
/// transport error) arrives.
pub struct XfcpClient {
    link: Link,
}

impl XfcpClient {
    /// Connects over UDP to a fabric's datagram transport.
    pub fn connect(addr: impl ToSocketAddrs) -> std::io::Result<XfcpClient> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(addr)?;
        Ok(XfcpClient {
            link: Link::Udp(socket),
        })
    }

    /// Attaches to a fabric over a serial byte stream.
    pub fn over_stream(stream: impl Read + Write + 'static) -> XfcpClient {
        XfcpClient {
            link: Link::Stream {
                stream: Box::new(stream),
                parser: StreamParser::new(MAX_FRAME_LEN),
            },
        }
    }

    /// Sets the receive timeout for UDP transports. Serial streams block at
    /// the device's own discretion; configure the device instead.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        match &self.link {
            Link::Udp(socket) => socket.set_read_timeout(timeout),
            Link::Stream { .. } => Ok(()),
        }
    }

    /// Sends one request frame and returns the next response frame.
    ///
    /// This is the raw exchange; the typed methods below are built on it.
    pub fn transact(&mut self, request: Frame) -> Result<Frame, ClientError> {
        match &mut self.link {
            Link::Udp(socket) => {
                socket.send(&request.to_bytes())?;
                let mut buf = vec![0u8; MAX_FRAME_LEN];
                let len = socket.recv(&mut buf)?;
                Ok(Frame::parse(&buf[..len])?)
            }
            Link::Stream { stream, parser } => {
                stream.write_all(&request.to_cobs_bytes())?;
                stream.flush()?;
                let mut chunk = [0u8; 4096];
                loop {
                    let n = stream.read(&mut chunk)?;
                    if n == 0 {
                        return Err(ClientError::StreamClosed);
                    }
                    if let Some(frame) = parser.push(&chunk[..n]).into_iter().next() {
                        return Ok(frame);
                    }
                }
            }
        }
    }

    /// Transacts and maps error responses onto typed errors.
    fn expect(&mut self, request: Frame, expected_op: u8) -> Result<Frame, ClientError> {
        let response = self.transact(request)?;
        match response.op {
            x if x == expected_op => Ok(response),
            op::ERR_ROUTING => Err(ClientError::Routing {
                port: response.payload.first().copied().unwrap_or(0),
                fan_out: response.payload.get(1).copied().unwrap_or(0),
            }),
            op::ERR_OUT_OF_RANGE => {
                let addr = response.payload.first().copied().unwrap_or(0);
                let len = match response.payload.get(1..3) {
                    Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
                    None => 0,
                };
                Err(ClientError::OutOfRange { addr, len })
            }
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Queries the self-descriptor of the node at `path`.
    ///
    /// A switch answers with a larger descriptor than a leaf endpoint; the
    /// first two bytes carry the node type id in either case.
    pub fn enumerate(&mut self, path: &[u8]) -> Result<Vec<u8>, ClientError> {
        let response = self.expect(Frame::enumerate_request(path.to_vec()), op::ENUM_RESP)?;
        Ok(response.payload)
    }

    /// Reads `len` bytes starting at register byte address `addr`.
    pub fn read(&mut self, path: &[u8], addr: u8, len: u16) -> Result<Vec<u8>, ClientError> {
        let response = self.expect(Frame::read_request(path.to_vec(), addr, len), op::READ_RESP)?;
        let expected = 3 + len as usize;
        if response.payload.len() < expected {
            return Err(ClientError::ShortResponse {
                expected,
                got: response.payload.len(),
            });
        }
        Ok(response.payload[3..expected].to_vec())
    }

    /// Writes `data` starting at register byte address `addr` and waits for
    /// the acknowledgement.
    pub fn write(&mut self, path: &[u8], addr: u8, data: &[u8]) -> Result<(), ClientError> {
        self.expect(Frame::write_request(path.to_vec(), addr, data), op::WRITE_RESP)?;
        Ok(())
    }

    /// Reads the 32-bit little-endian word at byte address `addr`.
    pub fn read_word(&mut self, path: &[u8], addr: u8) -> Result<u32, ClientError> {
        let data = self.read(path, addr, 4)?;
        Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Writes the 32-bit little-endian word at byte address `addr`.
    pub fn write_word(&mut self, path: &[u8], addr: u8, value: u32) -> Result<(), ClientError> {
        self.write(path, addr, &value.to_le_bytes())
    }

    /// Reads a word and keeps only the bits selected by `mask`.
    pub fn read_masked(&mut self, path: &[u8], addr: u8, mask: u32) -> Result<u32, ClientError> {
        Ok(self.read_word(path, addr)? & mask)
    }

    /// Updates only the bits selected by `mask`.
    ///
    /// This is two wire transactions (read, then write). Atomicity against
    /// other hosts is not provided here; serialize writers at the host level.
    pub fn write_masked(
        &mut self,
        path: &[u8],
        addr: u8,
        value: u32,
        mask: u32,
    ) -> Result<(), ClientError> {
        let current = self.read_word(path, addr)?;
        self.write_word(path, addr, (current & !mask) | (value & mask))
    }

    /// Reads a named register field through its descriptor.
    pub fn read_field(&mut self, path: &[u8], field: &Field) -> Result<u32, ClientError> {
        Ok(field.extract(self.read_word(path, field.addr)?))
    }

    /// Writes a named register field through its descriptor, preserving the
    /// rest of the word.
    pub fn write_field(
        &mut self,
        path: &[u8],
        field: &Field,
        value: u32,
    ) -> Result<(), ClientError> {
        self.write_masked(path, field.addr, field.insert(value), field.mask)
    }
}
