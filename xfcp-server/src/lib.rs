//! # XFCP Server Library
//!
//! This crate provides the building blocks for implementing XFCP node
//! fabrics: trees of switches and register endpoints that execute
//! enumerate / read / write commands arriving over a serial or datagram
//! transport.
//!
//! ## Architecture
//!
//! The crate is built around three components:
//!
//! - **[`RegisterFile`] Trait**: Defines the interface that register
//!   backends must implement (word reads, word writes, masked updates)
//! - **[`fabric::Node`]**: The routing fabric, a static tree of
//!   [`fabric::Switch`] and [`endpoint::RegisterNode`] values that forwards
//!   each frame one hop at a time toward its target
//! - **[`server`]**: Blocking transport loops ([`server::UdpServer`],
//!   [`server::SerialServer`]) that decode inbound bytes into frames,
//!   dispatch them into the fabric and send the responses back
//!
//! ## How It Works
//!
//! 1. A backend (in-memory array, memory-mapped hardware window) implements
//!    the [`RegisterFile`] trait
//! 2. Each backend is wrapped in a [`endpoint::RegisterNode`]; switches are
//!    stacked on top to form the fabric, built once at startup
//! 3. One transport loop per link feeds frames into the shared fabric root
//! 4. Every request resolves synchronously into at most one response, which
//!    retraces the request's hops back to the originating transport
//!
//! ## Routing
//!
//! Frames carry their downstream route as a list of port indices. A switch
//! pops the first element to pick the egress port and records the traversed
//! port on the return path; a frame whose path is exhausted is addressed to
//! the node it reached. A path element beyond a switch's fan-out produces a
//! routing-error response rather than a silent drop, so the host can observe
//! the failure.
//!
//! ## Basic Usage
//!
//! ```
//! use xfcp_server::fabric::{Node, Switch};
//! use xfcp_server::endpoint::RegisterNode;
//! use xfcp_server::mem::MemRegisterFile;
//! use xfcp_protocol::Frame;
//!
//! // One switch fanning out to two 64-word register endpoints.
//! let root = Node::from(Switch::new(vec![
//!     Node::from(RegisterNode::new(MemRegisterFile::new(64))),
//!     Node::from(RegisterNode::new(MemRegisterFile::new(64))),
//! ]));
//!
//! let response = root.handle(Frame::enumerate_request(vec![])).unwrap();
//! assert_eq!(response.payload.len(), 64);
//! ```
//!
//! ## Error Handling
//!
//! No failure is fatal to the fabric: malformed input is dropped at the
//! codec layer, misaddressed or out-of-range requests resolve to well-formed
//! error responses, and everything else resolves to exactly one response.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Configure logging with an
//! implementation like `env_logger` to see frames being routed, dropped
//! garbage and error responses.
//!
//! ## Thread Model
//!
//! Each transport loop runs on its own thread and makes blocking calls into
//! the shared fabric. The fabric itself carries no cross-request state; the
//! only shared mutable state is each endpoint's register file, guarded by a
//! per-endpoint lock held for the duration of one request's access.

pub mod endpoint;
pub mod fabric;
pub mod mem;
pub mod server;

/// Trait that register backends must implement to provide word-granular
/// storage for an endpoint.
///
/// The address space is an array of `word_count()` 32-bit words; wire-level
/// byte addresses map onto it little-endian (byte address `b` lives in word
/// `b / 4` at bit offset `(b % 4) * 8`). The endpoint bounds-checks every
/// request before touching the file, so implementations may assume
/// `addr < word_count()`.
///
/// Methods take `&mut self`; the owning [`endpoint::RegisterNode`] serializes
/// access behind its lock, which makes the read-modify-write sequence of
/// [`RegisterFile::write_masked`] indivisible relative to other writers of
/// the same endpoint.
pub trait RegisterFile {
    /// Number of addressable 32-bit words.
    fn word_count(&self) -> usize;

    /// Reads the word at `addr`.
    fn read_word(&mut self, addr: usize) -> u32;

    /// Writes the word at `addr`.
    fn write_word(&mut self, addr: usize, value: u32);

    /// Updates only the bits selected by `mask`, preserving the rest.
    fn write_masked(&mut self, addr: usize, value: u32, mask: u32) {
        let current = self.read_word(addr);
        self.write_word(addr, (current & !mask) | (value & mask));
    }
}
