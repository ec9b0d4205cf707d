#![allow(dead_code)]
use std::collections::VecDeque;

use gnss_relay::{
    nmea,
    rtcm::{ByteSource, Frame, Message, StreamReassembler},
    Result,
};

/// RTCM 1005, station near 32.07N 34.77E.
pub const FIXTURE_1005: &str = "d300133ed000038a58d9493c872f34109d07d6af48205ad7f7";
/// RTCM 1005, station near 38.80N 77.06W.
pub const FIXTURE_1005_WEST: &str = "d300133ed7d30202980edeef34b4bd62ac0941986f33360b98";

pub fn fixture(hexstr: &str) -> Vec<u8> {
    hex::decode(hexstr).expect("fixture is not valid hex")
}

/// A short frame with message type 1077 and an arbitrary body.
pub fn frame_1077(body: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x43, 0x50];
    payload.extend_from_slice(body);
    Frame::encode(&payload)
        .expect("payload too long")
        .into_bytes()
}

/// Wrap `body` as a complete NMEA sentence with checksum and CRLF.
pub fn nmea_line(body: &str) -> String {
    format!("${body}*{:02X}\r\n", nmea::checksum(body))
}

/// Byte source that returns one queued chunk per poll.
#[derive(Default)]
pub struct ChunkSource(pub VecDeque<Vec<u8>>);

impl ChunkSource {
    /// Split `dat` at the given ascending offsets.
    pub fn split_at(dat: &[u8], offsets: &[usize]) -> Self {
        let mut chunks = VecDeque::default();
        let mut start = 0;
        for &end in offsets {
            chunks.push_back(dat[start..end].to_vec());
            start = end;
        }
        chunks.push_back(dat[start..].to_vec());
        ChunkSource(chunks)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ByteSource for ChunkSource {
    fn poll(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.0.pop_front())
    }
}

/// Poll `source` until it is exhausted, then run framing steps until nothing is left to
/// emit, returning every message produced.
pub fn collect_messages(r: &mut StreamReassembler, source: &mut ChunkSource) -> Vec<Message> {
    let mut zult = Vec::default();
    while !source.is_empty() {
        if let Some(msg) = r.receive_frame(source).unwrap() {
            zult.push(msg);
        }
    }
    // discard steps return None without emitting, so allow a few in a row
    let mut idle = 0;
    while idle < 4 {
        match r.next_message() {
            Some(msg) => {
                zult.push(msg);
                idle = 0;
            }
            None => idle += 1,
        }
    }
    zult
}
