//! NMEA 0183 sentence validation and decoding.
//!
//! [NmeaDecoder] consumes the lines queued by [crate::serial::SerialIngestor] and keeps
//! the latest [FixRecord]. Only `GGA` and `GSA` sentences change the record; corrupt
//! lines are dropped and never reported as errors.
mod sentence;

use chrono::NaiveTime;
use crossbeam::channel::{Receiver, TryRecvError};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DecoderOptions;

pub use sentence::{Gga, Gsa, Sentence, TimeOfDay, DOP_DEFAULT};

/// Shortest line that can hold `$`, a sentence id and a checksum.
pub const MIN_SENTENCE_LEN: usize = 9;

/// Fix quality names, indexed by the GGA quality code.
pub const QUALITY_NAMES: [&str; 7] = [
    "No fix",
    "GNSS fix",
    "DGNSS fix",
    "PPS fix",
    "RTK fix",
    "RTK float",
    "Estimate",
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSentence {
    #[error("sentence too short")]
    TooShort,
    #[error("sentence does not start with '$'")]
    MissingStart,
    #[error("no checksum delimiter")]
    MissingChecksum,
    #[error("checksum {found:?} does not match computed {computed:02X}")]
    Checksum { found: String, computed: u8 },
}

/// XOR of all bytes of `body`, i.e., everything between `$` and `*`.
#[must_use]
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Check the structure and checksum of `line`, returning it without surrounding
/// whitespace.
///
/// # Errors
/// [InvalidSentence] describing the first problem found.
pub fn validate(line: &str) -> Result<&str, InvalidSentence> {
    let line = line.trim();
    let dat = line.as_bytes();
    if dat.len() < MIN_SENTENCE_LEN {
        return Err(InvalidSentence::TooShort);
    }
    if dat[0] != b'$' {
        return Err(InvalidSentence::MissingStart);
    }
    let star = dat.len() - 3;
    if dat[star] != b'*' {
        return Err(InvalidSentence::MissingChecksum);
    }
    // '$' and '*' are ASCII so these are char boundaries
    let computed = checksum(&line[1..star]);
    let found = &line[star + 1..];
    match u8::from_str_radix(found, 16) {
        Ok(value) if value == computed => Ok(line),
        _ => Err(InvalidSentence::Checksum {
            found: found.to_string(),
            computed,
        }),
    }
}

/// Latest position and fix state.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct FixRecord {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub quality: i32,
    pub satellites: u32,
    pub hdop: f64,
    pub pdop: f64,
    pub vdop: f64,
    pub time: TimeOfDay,
}

impl Default for FixRecord {
    fn default() -> Self {
        FixRecord {
            lat: 0.0,
            lon: 0.0,
            alt: 0.0,
            quality: 0,
            satellites: 0,
            hdop: DOP_DEFAULT,
            pdop: DOP_DEFAULT,
            vdop: DOP_DEFAULT,
            time: TimeOfDay::default(),
        }
    }
}

impl FixRecord {
    /// Fold `sentence` into this record, returning true if the position changed.
    ///
    /// `GSA` only updates the DOP values and so returns false.
    pub fn apply(&mut self, sentence: &Sentence) -> bool {
        match sentence {
            Sentence::Gga(gga) => {
                self.time = gga.time;
                self.lat = gga.lat;
                self.lon = gga.lon;
                self.quality = gga.quality;
                self.satellites = gga.satellites;
                self.hdop = gga.hdop;
                self.alt = gga.altitude;
                true
            }
            Sentence::Gsa(gsa) => {
                self.pdop = gsa.pdop;
                self.hdop = gsa.hdop;
                self.vdop = gsa.vdop;
                false
            }
            Sentence::Other => false,
        }
    }

    /// `HH:MM:SS`, seconds truncated.
    #[must_use]
    pub fn time_string(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            self.time.hour,
            self.time.minute,
            self.time.second.trunc() as u32
        )
    }

    /// `lat,lon,alt` with 8, 8 and 3 decimals.
    #[must_use]
    pub fn position_string(&self) -> String {
        format!("{:10.8},{:10.8},{:5.3}", self.lat, self.lon, self.alt)
    }

    #[must_use]
    pub fn quality_name(&self) -> &'static str {
        usize::try_from(self.quality)
            .ok()
            .and_then(|idx| QUALITY_NAMES.get(idx))
            .copied()
            .unwrap_or("unknown")
    }

    /// Time of day, if the fields form a valid time.
    #[must_use]
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        let second = self.time.second;
        if !(0.0..60.0).contains(&second) {
            return None;
        }
        let nanos = ((second.fract() * 1e9).round() as u32).min(999_999_999);
        NaiveTime::from_hms_nano_opt(
            self.time.hour,
            self.time.minute,
            second.trunc() as u32,
            nanos,
        )
    }
}

/// Decodes queued NMEA lines into a [FixRecord].
pub struct NmeaDecoder {
    lines: Receiver<String>,
    fix: FixRecord,
    verbose: bool,
}

impl NmeaDecoder {
    pub fn new(lines: Receiver<String>, opts: &DecoderOptions) -> Self {
        NmeaDecoder {
            lines,
            fix: FixRecord::default(),
            verbose: opts.verbose,
        }
    }

    /// Take the next valid sentence from the queue without blocking.
    ///
    /// Returns `None` if the queue is empty or the line taken from it is malformed or
    /// has a bad checksum. Checksum failures are logged at warn level, other problems
    /// only in verbose mode.
    pub fn read(&mut self) -> Option<String> {
        let line = match self.lines.try_recv() {
            Ok(line) => line,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
        };
        match validate(&line) {
            Ok(valid) => Some(valid.to_string()),
            Err(err @ InvalidSentence::Checksum { .. }) => {
                warn!(line = line.trim(), "{err}");
                None
            }
            Err(err) => {
                if self.verbose {
                    debug!(line = line.trim(), "{err}");
                }
                None
            }
        }
    }

    /// Decode a validated sentence, returning true if it updated the position.
    pub fn decode(&mut self, line: &str) -> bool {
        let sentence = Sentence::parse(line);
        if self.verbose && sentence != Sentence::Other {
            debug!(line, "decoding");
        }
        self.fix.apply(&sentence)
    }

    #[must_use]
    pub fn fix(&self) -> &FixRecord {
        &self.fix
    }
}
