//! Blocking transport loops that feed frames into a fabric.

use std::io::{self, Read, Write};
use std::net::{ToSocketAddrs, UdpSocket};

use xfcp_protocol::{Frame, StreamParser};

use crate::RegisterFile;
use crate::fabric::Node;

/// Largest frame either transport will accept or accumulate. A maximum-length
/// read response (64 KiB of data plus headers) must fit.
const DEFAULT_MAX_FRAME_LEN: usize = 128 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_frame_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Builder to create transport servers and modify configuration options
///
/// # Example
///
/// ```ignore
/// use xfcp_server::server::Builder;
///
/// let server = Builder::new()
///     .max_frame_len(4096)
///     .udp(&fabric_root);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the largest frame the transports accept.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.config.max_frame_len = len;
        self
    }

    /// Build a datagram server over `root`.
    pub fn udp<F: RegisterFile>(self, root: &Node<F>) -> UdpServer<'_, F> {
        UdpServer::new(root, self.config)
    }

    /// Build a serial server over `root`.
    pub fn serial<F: RegisterFile>(self, root: &Node<F>) -> SerialServer<'_, F> {
        SerialServer::new(root, self.config)
    }
}

/// Datagram transport: one request frame per datagram, one response datagram
/// per response frame, sent back to the source peer.
pub struct UdpServer<'a, F> {
    root: &'a Node<F>,
    config: Config,
}

impl<'a, F: RegisterFile> UdpServer<'a, F> {
    pub fn new(root: &'a Node<F>, config: Config) -> UdpServer<'a, F> {
        UdpServer { root, config }
    }

    /// Binds `addr` and serves until the socket fails.
    pub fn listen(&self, addr: impl ToSocketAddrs) -> Result<(), Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(addr)?;
        log::info!("Server listening for datagrams on {}", socket.local_addr()?);
        self.serve(&socket)?;
        Ok(())
    }

    /// Serves requests arriving on an already-bound socket.
    pub fn serve(&self, socket: &UdpSocket) -> io::Result<()> {
        let mut buf = vec![0u8; self.config.max_frame_len];
        loop {
            let (len, peer) = socket.recv_from(&mut buf)?;
            let frame = match Frame::parse(&buf[..len]) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Dropping malformed datagram from {}: {}", peer, e);
                    continue;
                }
            };
            log::debug!("Received op 0x{:02X} from {}", frame.op, peer);
            match self.root.handle(frame) {
                Some(response) => {
                    if let Err(e) = socket.send_to(&response.to_bytes(), peer) {
                        log::error!("Failed to send response to {}: {}", peer, e);
                    }
                }
                None => log::debug!("Request from {} produced no response", peer),
            }
        }
    }
}

/// Byte-stream transport: COBS-delimited frames over anything that reads and
/// writes bytes (a UART device node, a pseudo-terminal, a TCP byte pipe).
pub struct SerialServer<'a, F> {
    root: &'a Node<F>,
    config: Config,
}

impl<'a, F: RegisterFile> SerialServer<'a, F> {
    pub fn new(root: &'a Node<F>, config: Config) -> SerialServer<'a, F> {
        SerialServer { root, config }
    }

    /// Serves until the stream reaches end-of-file or fails.
    ///
    /// Garbage on the line never stalls the loop: the parser discards
    /// undecodable input through the next delimiter and resumes framing.
    pub fn serve(&self, mut reader: impl Read, mut writer: impl Write) -> io::Result<()> {
        let mut parser = StreamParser::new(self.config.max_frame_len);
        let mut chunk = [0u8; 4096];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                log::info!("Serial stream closed");
                return Ok(());
            }
            for frame in parser.push(&chunk[..n]) {
                log::debug!("Received op 0x{:02X} on serial stream", frame.op);
                if let Some(response) = self.root.handle(frame) {
                    writer.write_all(&response.to_cobs_bytes())?;
                    writer.flush()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Builder, Config};
    use crate::endpoint::RegisterNode;
    use crate::fabric::{Node, Switch};
    use crate::mem::MemRegisterFile;
    use std::io::Cursor;
    use xfcp_protocol::{Frame, StreamParser, op};

    fn fabric() -> Node<MemRegisterFile> {
        Node::from(Switch::new(vec![Node::from(RegisterNode::new(
            MemRegisterFile::new(16),
        ))]))
    }

    #[test]
    fn serial_serve_round_trip() {
        let root = fabric();
        let server = Builder::new().serial(&root);

        let mut input = Vec::new();
        input.extend_from_slice(
            &Frame::write_request(vec![0], 0x00, &[0x44, 0x33, 0x22, 0x11]).to_cobs_bytes(),
        );
        input.extend_from_slice(&Frame::read_request(vec![0], 0x00, 4).to_cobs_bytes());

        let mut output = Vec::new();
        server.serve(Cursor::new(input), &mut output).unwrap();

        let mut parser = StreamParser::new(4096);
        let responses = parser.push(&output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].op, op::WRITE_RESP);
        assert_eq!(responses[1].op, op::READ_RESP);
        assert_eq!(responses[1].payload[3..], [0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn serial_serve_survives_garbage() {
        let root = fabric();
        let server = super::SerialServer::new(&root, Config::default());

        let mut input = vec![0x13, 0x99, 0xFA]; // noise without a delimiter
        input.push(0x00);
        input.extend_from_slice(&Frame::enumerate_request(vec![]).to_cobs_bytes());

        let mut output = Vec::new();
        server.serve(Cursor::new(input), &mut output).unwrap();

        let mut parser = StreamParser::new(4096);
        let responses = parser.push(&output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].op, op::ENUM_RESP);
    }

    #[test]
    fn dropped_requests_produce_no_output() {
        let root = fabric();
        let server = super::SerialServer::new(&root, Config::default());

        // A read addressed to the switch itself is dropped.
        let input = Frame::read_request(vec![], 0x00, 4).to_cobs_bytes();
        let mut output = Vec::new();
        server.serve(Cursor::new(input), &mut output).unwrap();
        assert!(output.is_empty());
    }
}
