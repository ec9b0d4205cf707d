use serde::Serialize;

use crate::numeric::{degmin_to_degrees, parse_or};

/// Value used for any dilution of precision that is missing or cannot be parsed.
pub const DOP_DEFAULT: f64 = 99.99;

// GGA field positions
const GGA_TIME: usize = 1;
const GGA_LAT: usize = 2;
const GGA_NS: usize = 3;
const GGA_LON: usize = 4;
const GGA_EW: usize = 5;
const GGA_QUALITY: usize = 6;
const GGA_NSATS: usize = 7;
const GGA_HDOP: usize = 8;
const GGA_ALT: usize = 9;

// GSA field positions; 3 through 14 are satellite slots
const GSA_PDOP: usize = 15;
const GSA_HDOP: usize = 16;
const GSA_VDOP: usize = 17;

/// UTC time of day from a `hhmmss.sss` field.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

impl TimeOfDay {
    /// Parse `hhmmss.sss`. Each component that cannot be parsed is 0.
    #[must_use]
    pub fn parse(field: &str) -> Self {
        let part = |start: usize, end: Option<usize>| {
            let end = end.unwrap_or(field.len()).min(field.len());
            field.get(start.min(end)..end)
        };
        TimeOfDay {
            hour: parse_or(part(0, Some(2)), 0),
            minute: parse_or(part(2, Some(4)), 0),
            second: parse_or(part(4, None), 0.0),
        }
    }
}

/// Fix data (`GGA`).
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Gga {
    pub time: TimeOfDay,
    pub lat: f64,
    pub lon: f64,
    /// Fix quality code as received; codes outside the known table are kept.
    pub quality: i32,
    pub satellites: u32,
    pub hdop: f64,
    /// Altitude above mean sea level in meters.
    pub altitude: f64,
}

impl Gga {
    fn from_fields(fields: &[&str]) -> Self {
        let get = |idx: usize| fields.get(idx).copied();
        let text = |idx: usize| get(idx).unwrap_or_default();
        Gga {
            time: TimeOfDay::parse(text(GGA_TIME)),
            lat: degmin_to_degrees(text(GGA_LAT), text(GGA_NS)),
            lon: degmin_to_degrees(text(GGA_LON), text(GGA_EW)),
            quality: parse_or(get(GGA_QUALITY), 0),
            satellites: parse_or(get(GGA_NSATS), 0),
            hdop: parse_or(get(GGA_HDOP), DOP_DEFAULT),
            altitude: parse_or(get(GGA_ALT), 0.0),
        }
    }
}

/// Active satellites and dilution of precision (`GSA`). Only the DOP values are kept.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Gsa {
    pub pdop: f64,
    pub hdop: f64,
    pub vdop: f64,
}

impl Gsa {
    fn from_fields(fields: &[&str]) -> Self {
        let get = |idx: usize| fields.get(idx).copied();
        Gsa {
            pdop: parse_or(get(GSA_PDOP), DOP_DEFAULT),
            hdop: parse_or(get(GSA_HDOP), DOP_DEFAULT),
            vdop: parse_or(get(GSA_VDOP), DOP_DEFAULT),
        }
    }
}

/// A parsed NMEA sentence.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub enum Sentence {
    Gga(Gga),
    Gsa(Gsa),
    /// Any sentence type that is not decoded, or a line with too few fields.
    Other,
}

impl Sentence {
    /// Parse a sentence whose checksum has already been checked.
    ///
    /// Only the `GP` (GPS) and `GN` (multi-constellation) talkers are recognized. The
    /// trailing `*hh` checksum is ignored if present.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let body = line.rsplit_once('*').map_or(line, |(body, _)| body);
        let fields: Vec<&str> = body.split(',').collect();
        if fields.len() < 3 {
            return Sentence::Other;
        }
        match fields[0] {
            "$GPGGA" | "$GNGGA" => Sentence::Gga(Gga::from_fields(&fields)),
            "$GPGSA" | "$GNGSA" => Sentence::Gsa(Gsa::from_fields(&fields)),
            _ => Sentence::Other,
        }
    }
}
