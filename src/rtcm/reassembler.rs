use std::io::{self, Read};
use std::net::TcpStream;

use tracing::{debug, trace, warn};

use super::{crc24, Frame, Message, CRC_LEN, HEADER_LEN, MAX_PAYLOAD_LEN, PREAMBLE};
use crate::config::DecoderOptions;
use crate::prelude::*;

/// Largest single receive attempt, enough for one maximum length frame.
pub const POLL_SIZE: usize = 1030;
// Leading bytes at or below this count are noise even when they end in CRLF.
const MIN_TEXT_LEN: usize = 3;

/// A non-blocking source of stream bytes.
pub trait ByteSource {
    /// Make a single receive attempt, returning `Ok(None)` if no bytes are available.
    fn poll(&mut self) -> Result<Option<Vec<u8>>>;
}

impl ByteSource for TcpStream {
    fn poll(&mut self) -> Result<Option<Vec<u8>>> {
        self.set_nonblocking(true)?;
        let mut buf = vec![0u8; POLL_SIZE];
        let zult = match self.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        };
        self.set_nonblocking(false)?;
        zult
    }
}

/// Counters describing what a [StreamReassembler] has done with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub frames: u64,
    pub texts: u64,
    pub crc_failures: u64,
    pub length_scrubs: u64,
    /// Bytes dropped ahead of a preamble that was not preceded by CRLF.
    pub noise_bytes: u64,
    /// Bytes dropped by CRC or length scrubs.
    pub scrubbed_bytes: u64,
}

/// Turns an arbitrarily split byte stream into text segments and CRC-checked frames.
///
/// Any CRC failure or out of range length discards everything buffered. A single bit
/// error can therefore drop valid data that arrived in the same read.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    buf: Vec<u8>,
    stats: ReassemblyStats,
    verbose: bool,
}

impl StreamReassembler {
    pub fn new(opts: &DecoderOptions) -> Self {
        StreamReassembler {
            verbose: opts.verbose,
            ..Default::default()
        }
    }

    /// Append stream bytes to the buffer.
    pub fn push(&mut self, dat: &[u8]) {
        self.buf.extend_from_slice(dat);
    }

    /// Poll `source` once, buffering anything received, then run one framing step.
    ///
    /// # Errors
    /// Only errors from `source` itself. Corrupt data is never an error.
    pub fn receive_frame<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<Message>> {
        if let Some(dat) = source.poll()? {
            self.push(&dat);
        }
        Ok(self.next_message())
    }

    /// Run one framing step over the buffered bytes.
    ///
    /// Returns `None` when there is nothing to emit yet, which includes the step where
    /// noise or corrupt data is discarded. Calling again may then produce a message
    /// without any new input.
    pub fn next_message(&mut self) -> Option<Message> {
        let idx = self.buf.iter().position(|&b| b == PREAMBLE)?;

        if idx > 0 {
            if idx > MIN_TEXT_LEN && &self.buf[idx - 2..idx] == b"\r\n" {
                let text: Vec<u8> = self.buf.drain(..idx).collect();
                self.stats.texts += 1;
                if self.verbose {
                    debug!(len = text.len(), "text segment");
                }
                return Some(Message::Text(text));
            }
            if self.verbose {
                debug!(count = idx, "discarding bytes before preamble");
            }
            self.stats.noise_bytes += idx as u64;
            self.buf.drain(..idx);
            return None;
        }

        if self.buf.len() < HEADER_LEN {
            return None;
        }
        // Reserved bits are not masked off; anything set there is treated as an
        // out-of-sync length.
        let declared = usize::from(u16::from_be_bytes([self.buf[1], self.buf[2]]));
        if declared > MAX_PAYLOAD_LEN {
            warn!(declared, buffered = self.buf.len(), "invalid frame length, scrubbing");
            self.stats.length_scrubs += 1;
            self.scrub();
            return None;
        }

        let total = declared + HEADER_LEN + CRC_LEN;
        if self.buf.len() < total {
            return None;
        }

        let crc = crc24(&self.buf[..total]);
        if crc != 0 {
            warn!(
                residual = crc,
                declared,
                buffered = self.buf.len(),
                "frame checksum error, scrubbing"
            );
            self.stats.crc_failures += 1;
            self.scrub();
            return None;
        }

        let frame = Frame::new_unchecked(self.buf.drain(..total).collect());
        self.stats.frames += 1;
        trace!(
            typ = frame.message_type(),
            len = frame.len(),
            remaining = self.buf.len(),
            "frame"
        );
        Some(Message::Frame(frame))
    }

    /// Number of bytes waiting for a framing decision.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    fn scrub(&mut self) {
        self.stats.scrubbed_bytes += self.buf.len() as u64;
        self.buf.clear();
    }
}
