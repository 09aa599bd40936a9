//! End-to-end tests over the datagram transport.

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use xfcp_client::XfcpClient;
use xfcp_client::error::ClientError;
use xfcp_protocol::{Frame, LEAF_DESCRIPTOR_LEN, SWITCH_DESCRIPTOR_LEN, op};
use xfcp_server::server::Builder;
use xfcp_tests::test_fabric;

/// Starts a UDP-served fabric on an ephemeral port and returns its address.
fn start_udp_fabric(leaves: usize, words: usize) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    let root = Box::leak(Box::new(test_fabric(leaves, words)));
    thread::spawn(move || {
        let _ = Builder::new().udp(root).serve(&socket);
    });
    addr
}

fn connect(addr: SocketAddr) -> XfcpClient {
    let mut client = XfcpClient::connect(addr).unwrap();
    client.set_timeout(Some(Duration::from_secs(5))).unwrap();
    client
}

#[test]
fn enumerate_root_and_leaf() {
    let mut client = connect(start_udp_fabric(2, 64));

    let root = client.enumerate(&[]).unwrap();
    assert_eq!(root.len(), SWITCH_DESCRIPTOR_LEN);
    assert_eq!(root[2], 2);

    let leaf = client.enumerate(&[0]).unwrap();
    assert_eq!(leaf.len(), LEAF_DESCRIPTOR_LEN);
    assert_eq!(u16::from_le_bytes([leaf[2], leaf[3]]), 64);
}

#[test]
fn write_then_read() {
    let mut client = connect(start_udp_fabric(1, 16));

    let ack = client
        .transact(Frame::write_request(
            vec![0],
            0x00,
            &0x1122_3344u32.to_le_bytes(),
        ))
        .unwrap();
    assert_eq!(ack.op, op::WRITE_RESP);
    // The acknowledgement echoes address and length, carries no data, and
    // retraces the single hop it descended through.
    assert_eq!(ack.payload, vec![0x00, 0x04, 0x00]);
    assert_eq!(ack.path, vec![0]);
    assert!(ack.rpath.is_empty());

    let data = client.read(&[0], 0x00, 4).unwrap();
    assert_eq!(data, 0x1122_3344u32.to_le_bytes());
}

#[test]
fn endpoints_hold_independent_state() {
    let mut client = connect(start_udp_fabric(2, 16));

    client.write_word(&[0], 0x00, 0xAAAA_0001).unwrap();
    client.write_word(&[1], 0x00, 0xBBBB_0002).unwrap();
    assert_eq!(client.read_word(&[0], 0x00).unwrap(), 0xAAAA_0001);
    assert_eq!(client.read_word(&[1], 0x00).unwrap(), 0xBBBB_0002);
}

#[test]
fn masked_write_touches_selected_bits_only() {
    let mut client = connect(start_udp_fabric(1, 16));

    client.write_word(&[0], 0x00, 0xFFFF_FFFF).unwrap();
    client
        .write_masked(&[0], 0x00, 0x0000_1234, 0x0000_FFFF)
        .unwrap();
    assert_eq!(client.read_word(&[0], 0x00).unwrap(), 0xFFFF_1234);
}

#[test]
fn routing_error_reports_port_and_fan_out() {
    let mut client = connect(start_udp_fabric(2, 16));

    match client.enumerate(&[7]) {
        Err(ClientError::Routing { port, fan_out }) => {
            assert_eq!(port, 7);
            assert_eq!(fan_out, 2);
        }
        other => panic!("expected Routing error, got {:?}", other),
    }
}

#[test]
fn out_of_range_echoes_request() {
    let mut client = connect(start_udp_fabric(1, 64)); // 256 addressable bytes

    match client.read(&[0], 0x00, 257) {
        Err(ClientError::OutOfRange { addr, len }) => {
            assert_eq!(addr, 0x00);
            assert_eq!(len, 257);
        }
        other => panic!("expected OutOfRange error, got {:?}", other),
    }
}
