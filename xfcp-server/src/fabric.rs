//! The routing fabric: a static tree of switches and register endpoints.

use xfcp_protocol::{Frame, MAX_PATH_LEN, SWITCH_DESCRIPTOR_LEN, op};

use crate::RegisterFile;
use crate::endpoint::RegisterNode;

/// Node type id reported by switches in their enumerate descriptor.
pub const NTYPE_SWITCH: u16 = 0x0100;

/// One node of the fabric.
///
/// Topology is static and shallow, so the two node kinds are a plain enum
/// rather than a trait object hierarchy.
pub enum Node<F> {
    Switch(Switch<F>),
    Register(RegisterNode<F>),
}

impl<F: RegisterFile> Node<F> {
    /// Dispatches one frame into this subtree.
    ///
    /// Returns the response frame, or `None` when the frame is dropped
    /// without a response (malformed payload, a vendor or response opcode at
    /// an endpoint, a non-enumerate request addressed to a switch).
    pub fn handle(&self, frame: Frame) -> Option<Frame> {
        match self {
            Node::Switch(switch) => switch.handle(frame),
            Node::Register(register) => register.handle(frame),
        }
    }

    pub(crate) fn ntype(&self) -> u16 {
        match self {
            Node::Switch(switch) => switch.ntype(),
            Node::Register(register) => register.ntype(),
        }
    }
}

impl<F> From<Switch<F>> for Node<F> {
    fn from(value: Switch<F>) -> Self {
        Node::Switch(value)
    }
}

impl<F> From<RegisterNode<F>> for Node<F> {
    fn from(value: RegisterNode<F>) -> Self {
        Node::Register(value)
    }
}

/// Routing node with one upstream attachment and an ordered set of
/// downstream children.
pub struct Switch<F> {
    ntype: u16,
    children: Vec<Node<F>>,
}

impl<F: RegisterFile> Switch<F> {
    /// Creates a switch over `children`, in downstream port order.
    pub fn new(children: Vec<Node<F>>) -> Switch<F> {
        Switch::with_ntype(NTYPE_SWITCH, children)
    }

    /// Creates a switch reporting a custom node type id.
    pub fn with_ntype(ntype: u16, children: Vec<Node<F>>) -> Switch<F> {
        Switch { ntype, children }
    }

    /// Number of downstream ports.
    pub fn fan_out(&self) -> usize {
        self.children.len()
    }

    pub fn ntype(&self) -> u16 {
        self.ntype
    }

    fn handle(&self, mut frame: Frame) -> Option<Frame> {
        if frame.path.is_empty() {
            // The switch itself is the addressee; only enumerate is
            // meaningful at a non-leaf node.
            return match frame.op {
                op::ENUM_REQ => Some(frame.response(op::ENUM_RESP, self.descriptor())),
                other => {
                    log::debug!("switch dropping op 0x{:02X} addressed to itself", other);
                    None
                }
            };
        }

        if frame.rpath.len() >= MAX_PATH_LEN {
            // One more hop could not be recorded, so no compliant response
            // could retrace it either.
            log::warn!("dropping frame whose return path is at the fabric bound");
            return None;
        }

        let egress = frame.path.remove(0);
        let Some(child) = self.children.get(egress as usize) else {
            log::warn!(
                "routing error: port {} addressed on a switch with fan-out {}",
                egress,
                self.fan_out()
            );
            return Some(routing_error(&frame, egress, self.fan_out() as u8));
        };

        log::trace!("forwarding op 0x{:02X} via port {}", frame.op, egress);
        frame.rpath.push(egress);
        child.handle(frame)
    }

    /// Builds the fixed-size switch descriptor: node type id, fan-out and the
    /// node type id of each child, zero-filled to the descriptor length.
    fn descriptor(&self) -> Vec<u8> {
        let mut descriptor = vec![0u8; SWITCH_DESCRIPTOR_LEN];
        descriptor[0..2].copy_from_slice(&self.ntype.to_le_bytes());
        descriptor[2] = self.fan_out() as u8;
        for (index, child) in self.children.iter().enumerate() {
            let offset = 4 + index * 2;
            if offset + 2 > SWITCH_DESCRIPTOR_LEN {
                break;
            }
            descriptor[offset..offset + 2].copy_from_slice(&child.ntype().to_le_bytes());
        }
        descriptor
    }
}

/// Builds the routing-error response for a request that addressed `port` on
/// a node with `fan_out` downstream ports.
pub(crate) fn routing_error(request: &Frame, port: u8, fan_out: u8) -> Frame {
    request.response(op::ERR_ROUTING, vec![port, fan_out])
}

#[cfg(test)]
mod test {
    use super::{NTYPE_SWITCH, Node, Switch};
    use crate::endpoint::{NTYPE_REGISTER, RegisterNode};
    use crate::mem::MemRegisterFile;
    use xfcp_protocol::{
        Frame, LEAF_DESCRIPTOR_LEN, MAX_PATH_LEN, SWITCH_DESCRIPTOR_LEN, op,
    };

    /// Root switch with a register endpoint on port 0 and a nested switch on
    /// port 1 holding a second endpoint on its port 0.
    fn two_level_fabric() -> Node<MemRegisterFile> {
        let nested = Switch::new(vec![Node::from(RegisterNode::new(MemRegisterFile::new(
            32,
        )))]);
        Node::from(Switch::new(vec![
            Node::from(RegisterNode::new(MemRegisterFile::new(64))),
            Node::from(nested),
        ]))
    }

    #[test]
    fn enumerate_at_root() {
        let root = two_level_fabric();
        let response = root.handle(Frame::enumerate_request(vec![])).unwrap();

        assert_eq!(response.op, op::ENUM_RESP);
        assert!(response.path.is_empty());
        assert!(response.rpath.is_empty());
        assert_eq!(response.payload.len(), SWITCH_DESCRIPTOR_LEN);
        assert_eq!(
            u16::from_le_bytes([response.payload[0], response.payload[1]]),
            NTYPE_SWITCH
        );
        assert_eq!(response.payload[2], 2);
        // Child node type ids: register on port 0, switch on port 1.
        assert_eq!(
            u16::from_le_bytes([response.payload[4], response.payload[5]]),
            NTYPE_REGISTER
        );
        assert_eq!(
            u16::from_le_bytes([response.payload[6], response.payload[7]]),
            NTYPE_SWITCH
        );
    }

    #[test]
    fn enumerate_one_hop_down() {
        let root = two_level_fabric();
        let response = root.handle(Frame::enumerate_request(vec![0])).unwrap();

        assert_eq!(response.op, op::ENUM_RESP);
        assert_eq!(response.path, vec![0]);
        assert!(response.rpath.is_empty());
        assert_eq!(response.payload.len(), LEAF_DESCRIPTOR_LEN);
    }

    #[test]
    fn response_path_reverses_request_path() {
        let root = two_level_fabric();
        let response = root.handle(Frame::enumerate_request(vec![1, 0])).unwrap();

        assert_eq!(response.op, op::ENUM_RESP);
        assert_eq!(response.path, vec![0, 1]);
        assert!(response.rpath.is_empty());
        assert_eq!(response.payload.len(), LEAF_DESCRIPTOR_LEN);
    }

    #[test]
    fn bad_port_yields_routing_error() {
        let root = two_level_fabric();
        let response = root.handle(Frame::enumerate_request(vec![7])).unwrap();

        assert_eq!(response.op, op::ERR_ROUTING);
        assert!(response.path.is_empty());
        assert_eq!(response.payload, vec![7, 2]);
    }

    #[test]
    fn nested_routing_error_retraces_traversed_hops() {
        let root = two_level_fabric();
        let response = root.handle(Frame::enumerate_request(vec![1, 9])).unwrap();

        assert_eq!(response.op, op::ERR_ROUTING);
        // One hop (port 1) was traversed before the failure.
        assert_eq!(response.path, vec![1]);
        assert_eq!(response.payload, vec![9, 1]);
    }

    #[test]
    fn non_enumerate_at_switch_is_dropped() {
        let root = two_level_fabric();
        assert!(root.handle(Frame::read_request(vec![], 0, 4)).is_none());
    }

    #[test]
    fn saturated_return_path_is_dropped() {
        let root = two_level_fabric();
        let mut frame = Frame::enumerate_request(vec![0]);
        frame.rpath = vec![0; MAX_PATH_LEN];
        assert!(root.handle(frame).is_none());
    }
}
