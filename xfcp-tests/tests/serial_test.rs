//! End-to-end tests over a serial byte stream (carried here by a loopback
//! TCP connection, which is just as opaque a byte pipe as a UART).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use xfcp_client::XfcpClient;
use xfcp_protocol::{Frame, StreamParser, SWITCH_DESCRIPTOR_LEN, op};
use xfcp_server::fabric::Node;
use xfcp_server::mem::MemRegisterFile;
use xfcp_server::server::Builder;
use xfcp_tests::test_fabric;

/// Serves `root` over one accepted byte-stream connection.
fn serve_stream(root: &'static Node<MemRegisterFile>) -> TcpStream {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let reader = stream.try_clone().unwrap();
        let _ = Builder::new().serial(root).serve(reader, stream);
    });
    TcpStream::connect(addr).unwrap()
}

fn start_serial_fabric(leaves: usize, words: usize) -> TcpStream {
    let root: &'static Node<MemRegisterFile> = Box::leak(Box::new(test_fabric(leaves, words)));
    serve_stream(root)
}

#[test]
fn serial_write_then_read() {
    let mut client = XfcpClient::over_stream(start_serial_fabric(1, 16));

    client
        .write(&[0], 0x00, &[0xDE, 0xAD, 0xBE, 0xEF])
        .unwrap();
    assert_eq!(
        client.read(&[0], 0x00, 4).unwrap(),
        vec![0xDE, 0xAD, 0xBE, 0xEF]
    );
}

#[test]
fn garbage_does_not_stall_later_frames() {
    let mut stream = start_serial_fabric(1, 16);

    // Delimiter-free noise followed by a delimiter, then a valid request.
    // The noise must produce no response and must not break framing.
    stream.write_all(&[0x55; 33]).unwrap();
    stream.write_all(&[0x00]).unwrap();
    stream
        .write_all(&Frame::enumerate_request(vec![]).to_cobs_bytes())
        .unwrap();
    stream.flush().unwrap();

    let mut parser = StreamParser::new(4096);
    let mut chunk = [0u8; 4096];
    let frame = loop {
        let n = stream.read(&mut chunk).unwrap();
        assert!(n > 0, "stream closed before a response arrived");
        if let Some(frame) = parser.push(&chunk[..n]).into_iter().next() {
            break frame;
        }
    };
    assert_eq!(frame.op, op::ENUM_RESP);
    assert_eq!(frame.payload.len(), SWITCH_DESCRIPTOR_LEN);
}

#[test]
fn udp_and_serial_share_one_fabric() {
    use std::net::UdpSocket;
    use std::time::Duration;

    let root: &'static Node<MemRegisterFile> = Box::leak(Box::new(test_fabric(1, 16)));

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let udp_addr = socket.local_addr().unwrap();
    thread::spawn(move || {
        let _ = Builder::new().udp(root).serve(&socket);
    });
    let serial_stream = serve_stream(root);

    // A word written through the serial transport is visible over UDP.
    let mut serial_client = XfcpClient::over_stream(serial_stream);
    serial_client.write_word(&[0], 0x00, 0xCAFE_F00D).unwrap();

    let mut udp_client = XfcpClient::connect(udp_addr).unwrap();
    udp_client
        .set_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(udp_client.read_word(&[0], 0x00).unwrap(), 0xCAFE_F00D);
}
