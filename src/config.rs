//! Settings for the serial and caster sides of the relay.
//!
//! Every type can be built in code with its `builder()` or loaded from JSON, where any
//! field with a default may be omitted:
//! ```
//! use gnss_relay::RelayConfig;
//!
//! let config = RelayConfig::from_reader(r#"{
//!     "serial": {"port": "/dev/ttyACM0"},
//!     "ntrip": {"mount": "NEAR", "credentials": "me@example.com:none"}
//! }"#.as_bytes()).unwrap();
//! assert_eq!(config.ntrip.port, 2101);
//! ```
use std::{fs::File, io::Read, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::prelude::*;

pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_IDLE_MS: u64 = 1;
pub const DEFAULT_CLOSE_GRACE_MS: u64 = 1200;
pub const DEFAULT_CASTER: &str = "rtk2go.com";
pub const DEFAULT_CASTER_PORT: u16 = 2101;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

fn default_baud() -> u32 {
    DEFAULT_BAUD
}
fn default_idle_ms() -> u64 {
    DEFAULT_IDLE_MS
}
fn default_close_grace_ms() -> u64 {
    DEFAULT_CLOSE_GRACE_MS
}
fn default_host() -> String {
    DEFAULT_CASTER.to_string()
}
fn default_caster_port() -> u16 {
    DEFAULT_CASTER_PORT
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// GNSS receiver serial device settings.
#[derive(Serialize, Deserialize, TypedBuilder, Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or name, e.g., `/dev/ttyACM0` or `COM3`.
    #[builder(setter(into))]
    pub port: String,
    #[serde(default = "default_baud")]
    #[builder(default = DEFAULT_BAUD)]
    pub baud: u32,
    /// Ingest thread sleep when no bytes are available.
    #[serde(default = "default_idle_ms")]
    #[builder(default = DEFAULT_IDLE_MS)]
    pub idle_ms: u64,
    /// Time allowed for in-flight reads and writes to settle before the device is closed.
    #[serde(default = "default_close_grace_ms")]
    #[builder(default = DEFAULT_CLOSE_GRACE_MS)]
    pub close_grace_ms: u64,
}

impl SerialConfig {
    #[must_use]
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    #[must_use]
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

/// NTRIP caster connection settings.
#[derive(Serialize, Deserialize, TypedBuilder, Debug, Clone, PartialEq, Eq)]
pub struct NtripConfig {
    #[serde(default = "default_host")]
    #[builder(default = default_host(), setter(into))]
    pub host: String,
    #[serde(default = "default_caster_port")]
    #[builder(default = DEFAULT_CASTER_PORT)]
    pub port: u16,
    /// Mount point to stream from. Absent means only the source table is of interest.
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub mount: Option<String>,
    /// `user:password` for basic authentication.
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub credentials: Option<String>,
    /// 3 letter country code used to filter the source table.
    #[serde(default)]
    #[builder(default, setter(strip_option, into))]
    pub country: Option<String>,
    /// Connect and read timeout.
    #[serde(default = "default_timeout_ms")]
    #[builder(default = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    /// `<name>/<version>` sent in the `User-Agent` header.
    #[serde(default = "default_agent")]
    #[builder(default = default_agent(), setter(into))]
    pub agent: String,
}

impl NtripConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for NtripConfig {
    fn default() -> Self {
        NtripConfig::builder().build()
    }
}

/// Options shared by the stream decoders.
#[derive(Serialize, Deserialize, TypedBuilder, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Log malformed input at debug level.
    #[serde(default)]
    #[builder(default)]
    pub verbose: bool,
}

/// Complete relay configuration.
#[derive(Serialize, Deserialize, TypedBuilder, Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfig {
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub serial: Option<SerialConfig>,
    #[serde(default)]
    #[builder(default)]
    pub ntrip: NtripConfig,
    #[serde(default)]
    #[builder(default)]
    pub decoder: DecoderOptions,
}

impl RelayConfig {
    /// Load and validate JSON configuration.
    ///
    /// # Errors
    /// [Error::Json] if the JSON is invalid and [Error::Config] if it fails
    /// [RelayConfig::validate].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: RelayConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be opened, otherwise see [RelayConfig::from_reader].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Check for values that cannot work.
    ///
    /// # Errors
    /// [Error::Config] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if let Some(serial) = &self.serial {
            if serial.port.trim().is_empty() {
                return Err(Error::Config("serial port is empty".to_string()));
            }
            if serial.baud == 0 {
                return Err(Error::Config("serial baud must be > 0".to_string()));
            }
        }
        if self.ntrip.host.trim().is_empty() {
            return Err(Error::Config("caster host is empty".to_string()));
        }
        if self.ntrip.port == 0 {
            return Err(Error::Config("caster port must be > 0".to_string()));
        }
        if self.ntrip.timeout_ms == 0 {
            return Err(Error::Config("caster timeout must be > 0".to_string()));
        }
        Ok(())
    }
}
