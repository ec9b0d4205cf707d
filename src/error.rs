use std::io;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The serial device could not be opened.
    #[error("serial device {port} unavailable: {source}")]
    DeviceUnavailable {
        port: String,
        #[source]
        source: serialport::Error,
    },
    /// The serial device has been closed by [crate::serial::SerialIngestor::stop].
    #[error("serial device is closed")]
    DeviceClosed,

    /// TCP connection to a caster failed.
    #[error("cannot connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("no address found for {0}")]
    Resolve(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
