#![doc = include_str!("../README.md")]

mod error;
mod numeric;

pub mod config;
pub mod geodesy;
pub mod nmea;
pub mod ntrip;
pub mod rtcm;
pub mod serial;

pub use config::{DecoderOptions, NtripConfig, RelayConfig, SerialConfig};
pub use error::{Error, Result};
pub use geodesy::{ecef_to_geodetic, haversine, Geodetic};
pub use nmea::{FixRecord, NmeaDecoder, Sentence};
pub use ntrip::{MountDistance, NtripClient, SourceEntry, SourceTable};
pub use rtcm::{Frame, Message, MessageTally, StationPosition, StreamReassembler};
pub use serial::{SerialDevice, SerialIngestor};

pub(crate) mod prelude {
    pub use crate::error::{Error, Result};
}
