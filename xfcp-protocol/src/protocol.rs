/// XFCP operation codes.
///
/// The six register operations are fixed by the wire contract. Codes
/// `0x80..=0xDF` are reserved for vendor-specific operations; switches forward
/// them like any other frame and register endpoints ignore them. The error
/// response codes live above the vendor range, clear of the enumerate pair.
pub mod op {
    /// Read a byte range from a register endpoint.
    pub const READ_REQ: u8 = 0x10;
    /// Response to [`READ_REQ`], carrying the requested bytes.
    pub const READ_RESP: u8 = 0x11;
    /// Write a byte range to a register endpoint.
    pub const WRITE_REQ: u8 = 0x12;
    /// Acknowledgement of [`WRITE_REQ`], echoing address and length.
    pub const WRITE_RESP: u8 = 0x13;
    /// Request a node's self-descriptor.
    pub const ENUM_REQ: u8 = 0xFE;
    /// Response to [`ENUM_REQ`], carrying the descriptor blob.
    pub const ENUM_RESP: u8 = 0xFF;
    /// Error response: the path referenced a port beyond a switch's fan-out.
    pub const ERR_ROUTING: u8 = 0xE0;
    /// Error response: a register access ran past the endpoint's address space.
    pub const ERR_OUT_OF_RANGE: u8 = 0xE1;
    /// First vendor-specific operation code.
    pub const VENDOR_MIN: u8 = 0x80;
    /// Last vendor-specific operation code.
    pub const VENDOR_MAX: u8 = 0xDF;
}

/// Upper bound on the number of path (and return-path) elements in a frame.
///
/// The bound is a property of the fabric depth, not of the one-byte length
/// prefix; frames declaring more hops than this are rejected as malformed.
pub const MAX_PATH_LEN: usize = 32;

/// Descriptor length returned by a switch (a node with downstream ports).
pub const SWITCH_DESCRIPTOR_LEN: usize = 64;

/// Descriptor length returned by a leaf register endpoint.
pub const LEAF_DESCRIPTOR_LEN: usize = 32;

/// One XFCP message.
///
/// Frames are source-routed: `path` holds the downstream port indices still to
/// be consumed on the way to the target, one per switch hop. Each hop moves
/// the traversed port onto the tail of `rpath`, so a frame that has fully
/// descended carries its route in `rpath` and an empty `path`. Responses are
/// built with the reversed `rpath` as their `path`, which makes them retrace
/// the request's hops in reverse order.
///
/// `payload` layout depends on `op`; see the [`op`] module and the crate
/// documentation for the per-operation formats.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Frame {
    /// Operation code, one of the [`op`] constants or a vendor code.
    pub op: u8,
    /// Remaining downstream route, consumed front-to-back.
    pub path: Vec<u8>,
    /// Ports traversed so far, appended at the tail on each hop.
    pub rpath: Vec<u8>,
    /// Operation-specific body.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a fresh request frame with an empty return path.
    pub fn new(op: u8, path: Vec<u8>, payload: Vec<u8>) -> Frame {
        Frame {
            op,
            path,
            rpath: Vec::new(),
            payload,
        }
    }

    /// Creates an enumerate request addressed to the node at `path`.
    /// An empty path addresses the node the transport is attached to.
    pub fn enumerate_request(path: Vec<u8>) -> Frame {
        Frame::new(op::ENUM_REQ, path, Vec::new())
    }

    /// Creates a read request for `len` bytes starting at register byte
    /// address `addr`.
    pub fn read_request(path: Vec<u8>, addr: u8, len: u16) -> Frame {
        let mut payload = vec![addr];
        payload.extend_from_slice(&len.to_le_bytes());
        Frame::new(op::READ_REQ, path, payload)
    }

    /// Creates a write request placing `data` at register byte address `addr`.
    ///
    /// `data` must not exceed `u16::MAX` bytes; the length field on the wire
    /// is 16 bits.
    pub fn write_request(path: Vec<u8>, addr: u8, data: &[u8]) -> Frame {
        let mut payload = vec![addr];
        payload.extend_from_slice(&(data.len() as u16).to_le_bytes());
        payload.extend_from_slice(data);
        Frame::new(op::WRITE_REQ, path, payload)
    }

    /// Builds the response to this request.
    ///
    /// The response's path is the request's accumulated return path in
    /// reverse, and its own return path starts out empty, so it retraces the
    /// request's hops back to the originating transport.
    pub fn response(&self, op: u8, payload: Vec<u8>) -> Frame {
        let mut path = self.rpath.clone();
        path.reverse();
        Frame {
            op,
            path,
            rpath: Vec::new(),
            payload,
        }
    }

    /// Length of this frame in its datagram encoding.
    pub fn wire_len(&self) -> usize {
        3 + self.path.len() + self.rpath.len() + self.payload.len()
    }

    /// True for the two error response codes.
    pub fn is_error(&self) -> bool {
        self.op == op::ERR_ROUTING || self.op == op::ERR_OUT_OF_RANGE
    }
}

#[test]
fn response_reverses_rpath() {
    let mut request = Frame::enumerate_request(vec![]);
    request.rpath = vec![1, 2, 3];
    let response = request.response(op::ENUM_RESP, vec![0xAB]);
    assert_eq!(response.path, vec![3, 2, 1]);
    assert!(response.rpath.is_empty());
    assert_eq!(response.payload, vec![0xAB]);
}

#[test]
fn request_constructors() {
    let read = Frame::read_request(vec![0, 1], 0x20, 0x0104);
    assert_eq!(read.op, op::READ_REQ);
    assert_eq!(read.path, vec![0, 1]);
    assert!(read.rpath.is_empty());
    assert_eq!(read.payload, vec![0x20, 0x04, 0x01]);

    let write = Frame::write_request(vec![], 0x00, &[0xDE, 0xAD]);
    assert_eq!(write.payload, vec![0x00, 0x02, 0x00, 0xDE, 0xAD]);
    assert_eq!(write.wire_len(), 3 + 5);
}
