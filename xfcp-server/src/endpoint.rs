//! Terminal fabric nodes that execute register commands.

use std::sync::Mutex;

use xfcp_protocol::{Frame, LEAF_DESCRIPTOR_LEN, op};

use crate::RegisterFile;
use crate::fabric::routing_error;

/// Default node type id reported by register endpoints.
pub const NTYPE_REGISTER: u16 = 0x8000;

/// Terminal node owning an addressable register file.
///
/// The dispatcher is stateless between requests: each request is parsed,
/// executed against the register file and answered with exactly one response
/// frame. All register access for one request happens under a single
/// acquisition of the endpoint's lock, which also makes masked updates
/// indivisible relative to other writers.
pub struct RegisterNode<F> {
    ntype: u16,
    file: Mutex<F>,
}

impl<F: RegisterFile> RegisterNode<F> {
    /// Wraps a register file in an endpoint with the default node type id.
    pub fn new(file: F) -> RegisterNode<F> {
        RegisterNode::with_ntype(file, NTYPE_REGISTER)
    }

    /// Wraps a register file, reporting a device-specific node type id in the
    /// enumerate descriptor (for example a PHY block identifier).
    pub fn with_ntype(file: F, ntype: u16) -> RegisterNode<F> {
        RegisterNode {
            ntype,
            file: Mutex::new(file),
        }
    }

    pub fn ntype(&self) -> u16 {
        self.ntype
    }

    /// Runs `access` with exclusive use of the register file.
    ///
    /// This is the access path for co-located code (a driver sharing the
    /// process with the fabric); protocol requests take the same lock, so a
    /// read-modify-write inside `access` cannot interleave with them.
    pub fn with_file<R>(&self, access: impl FnOnce(&mut F) -> R) -> R {
        let mut file = self.file.lock().unwrap_or_else(|poisoned| {
            // A panicked writer cannot leave a torn word; keep serving.
            poisoned.into_inner()
        });
        access(&mut file)
    }

    pub(crate) fn handle(&self, frame: Frame) -> Option<Frame> {
        if !frame.path.is_empty() {
            // The address descends past this leaf.
            log::warn!(
                "routing error: port {} addressed on a register endpoint",
                frame.path[0]
            );
            return Some(routing_error(&frame, frame.path[0], 0));
        }

        match frame.op {
            op::ENUM_REQ => Some(frame.response(op::ENUM_RESP, self.descriptor())),
            op::READ_REQ => self.read(&frame),
            op::WRITE_REQ => self.write(&frame),
            other => {
                log::debug!("register endpoint ignoring op 0x{:02X}", other);
                None
            }
        }
    }

    /// Builds the fixed-size leaf descriptor: node type id and word count,
    /// zero-filled to the descriptor length.
    fn descriptor(&self) -> Vec<u8> {
        let word_count = self.with_file(|file| file.word_count());
        let mut descriptor = vec![0u8; LEAF_DESCRIPTOR_LEN];
        descriptor[0..2].copy_from_slice(&self.ntype.to_le_bytes());
        let reported = word_count.min(u16::MAX as usize) as u16;
        descriptor[2..4].copy_from_slice(&reported.to_le_bytes());
        descriptor
    }

    fn read(&self, frame: &Frame) -> Option<Frame> {
        let (addr, len) = parse_header(&frame.payload)?;
        log::debug!("read: addr=0x{:02X}, len={}", addr, len);

        self.with_file(|file| {
            if addr + len > file.word_count() * 4 {
                return Some(out_of_range(frame));
            }
            let mut data = Vec::with_capacity(len);
            for byte_addr in addr..addr + len {
                let word = file.read_word(byte_addr / 4);
                data.push((word >> ((byte_addr % 4) * 8)) as u8);
            }
            let mut payload = frame.payload[..3].to_vec();
            payload.extend_from_slice(&data);
            Some(frame.response(op::READ_RESP, payload))
        })
    }

    fn write(&self, frame: &Frame) -> Option<Frame> {
        let (addr, len) = parse_header(&frame.payload)?;
        if frame.payload.len() < 3 + len {
            log::warn!(
                "dropping write with short data section: declared {}, got {}",
                len,
                frame.payload.len() - 3
            );
            return None;
        }
        let data = &frame.payload[3..3 + len];
        log::debug!("write: addr=0x{:02X}, len={}", addr, len);
        log::trace!("write data: {:02x?}", data);

        self.with_file(|file| {
            if addr + len > file.word_count() * 4 {
                return Some(out_of_range(frame));
            }
            // Merge word by word; partial words preserve their other bytes.
            let mut index = 0;
            while index < len {
                let byte_addr = addr + index;
                let offset = byte_addr % 4;
                let take = (4 - offset).min(len - index);
                let mut value = 0u32;
                let mut mask = 0u32;
                for k in 0..take {
                    value |= u32::from(data[index + k]) << ((offset + k) * 8);
                    mask |= 0xFF << ((offset + k) * 8);
                }
                if mask == u32::MAX {
                    file.write_word(byte_addr / 4, value);
                } else {
                    file.write_masked(byte_addr / 4, value, mask);
                }
                index += take;
            }
            Some(frame.response(op::WRITE_RESP, frame.payload[..3].to_vec()))
        })
    }
}

/// Parses the `addr:1, len:2 (LE)` header shared by read and write payloads.
fn parse_header(payload: &[u8]) -> Option<(usize, usize)> {
    if payload.len() < 3 {
        log::warn!(
            "dropping register request with short header: {} bytes",
            payload.len()
        );
        return None;
    }
    let addr = payload[0] as usize;
    let len = u16::from_le_bytes([payload[1], payload[2]]) as usize;
    Some((addr, len))
}

/// Out-of-range error response echoing the original address and length.
fn out_of_range(request: &Frame) -> Frame {
    request.response(op::ERR_OUT_OF_RANGE, request.payload[..3].to_vec())
}
