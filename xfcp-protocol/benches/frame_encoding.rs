use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use xfcp_protocol::{Frame, StreamParser};

fn encoding(c: &mut Criterion) {
    let frame = Frame::write_request(vec![1, 3], 0x00, &vec![0x5A; 256]);

    c.bench_function("datagram_encode_256", |b| {
        b.iter(|| black_box(&frame).to_bytes())
    });

    c.bench_function("cobs_encode_256", |b| {
        b.iter(|| black_box(&frame).to_cobs_bytes())
    });

    let datagram = frame.to_bytes();
    c.bench_function("datagram_parse_256", |b| {
        b.iter(|| Frame::parse(black_box(&datagram)).unwrap())
    });

    let stream: Vec<u8> = (0..16).flat_map(|_| frame.to_cobs_bytes()).collect();
    c.bench_function("stream_parse_16_frames", |b| {
        b.iter(|| {
            let mut parser = StreamParser::new(4096);
            parser.push(black_box(&stream)).len()
        })
    });
}

criterion_group!(benches, encoding);
criterion_main!(benches);
