use std::collections::BTreeMap;

use super::{get_signed_bits, get_unsigned_bits, Frame, CRC_LEN, HEADER_LEN, PREAMBLE};
use crate::geodesy::{ecef_to_geodetic, Geodetic};

/// Reference station antenna position decoded from a 1005 or 1006 message.
pub type StationPosition = Geodetic;

/// Stationary RTK reference station ARP messages.
pub const STATION_POSITION_TYPES: [u16; 2] = [1005, 1006];

/// ECEF fields are in units of 0.1 mm.
const ECEF_SCALE: f64 = 0.0001;
const ECEF_WIDTH: usize = 38;
const ECEF_X_OFFSET: usize = 34;
const ECEF_Y_OFFSET: usize = 74;
const ECEF_Z_OFFSET: usize = 114;

/// Message number of the frame in `dat`, or 0 if `dat` does not start with a frame.
#[must_use]
pub fn message_type(dat: &[u8]) -> u16 {
    if dat.len() < HEADER_LEN + 2 || dat[0] != PREAMBLE {
        return 0;
    }
    (u16::from(dat[3]) << 4) | u16::from(dat[4] >> 4)
}

/// Decode the reference station position from a 1005/1006 frame.
///
/// Any other message, or a payload too short to hold the ECEF fields, produces the
/// all-zero position. No state is kept between calls.
#[must_use]
pub fn decode_station_position(dat: &[u8]) -> StationPosition {
    if dat.len() < HEADER_LEN + CRC_LEN {
        return StationPosition::default();
    }
    let payload = &dat[HEADER_LEN..dat.len() - CRC_LEN];
    match get_unsigned_bits(payload, 0, 12) {
        Some(num) if STATION_POSITION_TYPES.contains(&(num as u16)) => (),
        _ => return StationPosition::default(),
    }
    let field = |offset| get_signed_bits(payload, offset, ECEF_WIDTH);
    let (Some(x), Some(y), Some(z)) = (
        field(ECEF_X_OFFSET),
        field(ECEF_Y_OFFSET),
        field(ECEF_Z_OFFSET),
    ) else {
        return StationPosition::default();
    };
    ecef_to_geodetic(
        x as f64 * ECEF_SCALE,
        y as f64 * ECEF_SCALE,
        z as f64 * ECEF_SCALE,
    )
}

impl Frame {
    /// See [decode_station_position].
    #[must_use]
    pub fn station_position(&self) -> StationPosition {
        decode_station_position(self.as_bytes())
    }
}

/// Counts of the message types seen on a stream.
///
/// Each stream keeps its own tally; there is no shared or global state.
#[derive(Debug, Clone, Default)]
pub struct MessageTally {
    counts: BTreeMap<u16, u64>,
}

impl MessageTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the message type of `dat`, returning it. Data that is not a frame is
    /// returned as type 0 and not counted.
    pub fn record(&mut self, dat: &[u8]) -> u16 {
        let typ = message_type(dat);
        if typ != 0 {
            *self.counts.entry(typ).or_default() += 1;
        }
        typ
    }

    #[must_use]
    pub fn count(&self, typ: u16) -> u64 {
        self.counts.get(&typ).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Message types seen so far, ascending.
    #[must_use]
    pub fn types(&self) -> Vec<u16> {
        self.counts.keys().copied().collect()
    }

    /// `type:count` pairs, e.g. `1005:3, 1077:12`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|(typ, count)| format!("{typ}:{count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// All types seen with `current` bracketed, e.g. ` 1005 [1077] 1087 `.
    #[must_use]
    pub fn types_string(&self, current: u16) -> String {
        self.counts
            .keys()
            .map(|&typ| {
                if typ == current {
                    format!("[{typ}]")
                } else {
                    format!(" {typ} ")
                }
            })
            .collect()
    }
}
