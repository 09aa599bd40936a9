//! Shared helpers for the end-to-end tests.

use xfcp_server::endpoint::RegisterNode;
use xfcp_server::fabric::{Node, Switch};
use xfcp_server::mem::MemRegisterFile;

/// Root switch fanning out to `leaves` register endpoints of `words` 32-bit
/// words each.
pub fn test_fabric(leaves: usize, words: usize) -> Node<MemRegisterFile> {
    let children = (0..leaves)
        .map(|_| Node::from(RegisterNode::new(MemRegisterFile::new(words))))
        .collect();
    Node::from(Switch::new(children))
}
