//! Tests for the async codec exposed behind the protocol crate's `tokio`
//! feature.

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::Framed;
use xfcp_protocol::tokio_codec::FrameCodec;
use xfcp_protocol::{Frame, op};

#[tokio::test]
async fn framed_round_trip() {
    let (host_io, device_io) = tokio::io::duplex(4096);
    let mut host = Framed::new(host_io, FrameCodec::default());
    let mut device = Framed::new(device_io, FrameCodec::default());

    let request = Frame::read_request(vec![1], 0x00, 8);
    host.send(request.clone()).await.unwrap();
    let received = device.next().await.unwrap().unwrap();
    assert_eq!(received, request);

    let mut routed = received.clone();
    routed.path.clear();
    routed.rpath = vec![1];
    let response = routed.response(op::READ_RESP, vec![0x00, 0x08, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]);
    device.send(response.clone()).await.unwrap();

    let arrived = host.next().await.unwrap().unwrap();
    assert_eq!(arrived, response);
    assert_eq!(arrived.path, vec![1]);
}

#[tokio::test]
async fn framed_decoder_skips_garbage() {
    let (mut raw, framed_io) = tokio::io::duplex(4096);
    let mut framed = Framed::new(framed_io, FrameCodec::default());

    raw.write_all(&[0xAB, 0xCD, 0x00]).await.unwrap();
    let frame = Frame::enumerate_request(vec![2, 0]);
    raw.write_all(&frame.to_cobs_bytes()).await.unwrap();

    assert_eq!(framed.next().await.unwrap().unwrap(), frame);
}
