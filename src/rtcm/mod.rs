//! RTCM3 stream reassembly and message decoding.
//!
//! A caster delivers RTCM3 frames over a plain TCP stream with no guarantee that a read
//! contains whole frames, and may interleave plaintext (e.g., an ``ICY 200 OK`` response
//! line) ahead of the binary data. [StreamReassembler] turns such a stream into
//! [Message]s, each either a text segment or a [Frame] whose CRC has been verified.
//!
//! Frame layout:
//! ```text
//! +------+---------+--------+-----------------+--------+
//! | 0xD3 | 6 bits  | 10 bit | payload         | CRC24Q |
//! |      | reserved| length | (length bytes)  | 3 bytes|
//! +------+---------+--------+-----------------+--------+
//! ```
mod bits;
mod crc;
mod message;
mod reassembler;

pub use bits::{get_signed_bits, get_unsigned_bits};
pub use crc::{crc24, CRC24Q_POLY, CRC24_TABLE};
pub use message::{decode_station_position, message_type, MessageTally, StationPosition};
pub use reassembler::{ByteSource, ReassemblyStats, StreamReassembler, POLL_SIZE};

/// First byte of every RTCM3 frame.
pub const PREAMBLE: u8 = 0xd3;
/// Preamble, reserved bits and length.
pub const HEADER_LEN: usize = 3;
/// Length of the CRC24Q trailer.
pub const CRC_LEN: usize = 3;
/// Largest declared length accepted before the stream is considered out of sync.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// A complete RTCM3 frame, header and CRC trailer included, that passed its CRC check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Construct from the bytes of a single complete frame, or `None` if the bytes are not
    /// exactly one frame with a valid CRC.
    #[must_use]
    pub fn from_bytes(dat: Vec<u8>) -> Option<Self> {
        if dat.len() < HEADER_LEN + CRC_LEN || dat[0] != PREAMBLE {
            return None;
        }
        let len = usize::from(u16::from_be_bytes([dat[1], dat[2]]));
        if dat.len() != len + HEADER_LEN + CRC_LEN || crc24(&dat) != 0 {
            return None;
        }
        Some(Frame(dat))
    }

    /// Build a frame around `payload`, computing the header and CRC. Returns `None` if the
    /// payload is too long for the 10 bit length field.
    #[must_use]
    pub fn encode(payload: &[u8]) -> Option<Self> {
        if payload.len() > 0x3ff {
            return None;
        }
        let len = u16::try_from(payload.len()).ok()?;
        let mut dat = Vec::with_capacity(payload.len() + HEADER_LEN + CRC_LEN);
        dat.push(PREAMBLE);
        dat.extend_from_slice(&len.to_be_bytes());
        dat.extend_from_slice(payload);
        let crc = crc24(&dat);
        dat.extend_from_slice(&crc.to_be_bytes()[1..]);
        Some(Frame(dat))
    }

    /// Caller guarantees `dat` is a complete, CRC-checked frame.
    pub(crate) fn new_unchecked(dat: Vec<u8>) -> Self {
        Frame(dat)
    }

    /// All frame bytes, suitable for forwarding to a receiver as-is.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload length from the 10 bit header length field.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        usize::from(u16::from_be_bytes([self.0[1], self.0[2]]) & 0x3ff)
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.0[HEADER_LEN..self.0.len() - CRC_LEN]
    }

    /// 12 bit message number at the start of the payload.
    #[must_use]
    pub fn message_type(&self) -> u16 {
        message_type(&self.0)
    }

    /// CRC value carried in the trailer.
    #[must_use]
    pub fn crc(&self) -> u32 {
        let n = self.0.len();
        u32::from_be_bytes([0, self.0[n - 3], self.0[n - 2], self.0[n - 1]])
    }

    /// Total number of bytes in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A unit produced by [StreamReassembler].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Plaintext that preceded a frame, CRLF terminator included.
    Text(Vec<u8>),
    /// A CRC-checked binary frame.
    Frame(Frame),
}
