//! NTRIP caster client.
//!
//! NTRIP is HTTP/1.0-like: the client sends a `GET` for a mount point and the caster
//! responds with a status line followed by the raw RTCM3 stream, or with a plaintext
//! source table if no mount was given.
//!
//! ```no_run
//! use gnss_relay::{Message, NtripClient};
//!
//! let mut client = NtripClient::connect("rtk2go.com", 2101).unwrap();
//! let table = client.source_table(Some("GBR")).unwrap();
//! for mount in table.nearest(51.5, -0.12, 3) {
//!     println!("{} {:9.3} km", mount.name, mount.km);
//! }
//!
//! let mut client = NtripClient::connect("rtk2go.com", 2101).unwrap();
//! client.request("NEAR", Some("me@example.com:none")).unwrap();
//! loop {
//!     if let Some(Message::Frame(frame)) = client.receive_rtcm().unwrap() {
//!         println!("{}", frame.message_type());
//!     }
//! }
//! ```
mod sourcetable;

use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
};

use base64::Engine;
use tracing::{debug, trace};

use crate::config::{DecoderOptions, NtripConfig};
use crate::prelude::*;
use crate::rtcm::{ByteSource, Message, StreamReassembler, POLL_SIZE};

pub use sourcetable::{MountDistance, SourceEntry, SourceTable};

/// Build the request for `mount`; an empty mount requests the source table.
#[must_use]
pub fn request_text(
    host: &str,
    port: u16,
    agent: &str,
    mount: &str,
    credentials: Option<&str>,
) -> String {
    let mut req = format!(
        "GET /{mount} HTTP/1.0\r\n\
         Host: {host}:{port}\r\n\
         User-Agent: NTRIP {agent}\r\n\
         Accept: */*\r\n\
         Connection: close\r\n"
    );
    if let Some(creds) = credentials.filter(|c| !c.is_empty()) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        req.push_str(&format!("Authorization: Basic {encoded}\r\n"));
    }
    req.push_str("\r\n");
    req
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// A TCP connection to an NTRIP caster.
pub struct NtripClient {
    stream: TcpStream,
    host: String,
    port: u16,
    agent: String,
    reassembler: StreamReassembler,
}

impl NtripClient {
    /// Connect to `host:port` with the default timeout.
    ///
    /// # Errors
    /// See [NtripClient::connect_with].
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let config = NtripConfig::builder().host(host).port(port).build();
        Self::connect_with(&config)
    }

    /// Connect to the configured caster. The timeout bounds the connect and every
    /// subsequent blocking read.
    ///
    /// # Errors
    /// [Error::Resolve] if the host has no address, or [Error::Connect] if no address
    /// accepted a connection.
    pub fn connect_with(config: &NtripConfig) -> Result<Self> {
        let timeout = config.timeout();
        let addrs: Vec<_> = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|_| Error::Resolve(config.host.clone()))?
            .collect();
        if addrs.is_empty() {
            return Err(Error::Resolve(config.host.clone()));
        }

        let mut last_err = io::Error::new(io::ErrorKind::NotConnected, "no address tried");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    debug!(%addr, host = %config.host, "connected to caster");
                    return Ok(NtripClient {
                        stream,
                        host: config.host.clone(),
                        port: config.port,
                        agent: config.agent.clone(),
                        reassembler: StreamReassembler::default(),
                    });
                }
                Err(err) => {
                    debug!(%addr, "connect failed: {err}");
                    last_err = err;
                }
            }
        }
        Err(Error::Connect {
            host: config.host.clone(),
            port: config.port,
            source: last_err,
        })
    }

    /// Use `opts` for the RTCM reassembler, discarding anything already buffered.
    #[must_use]
    pub fn with_options(mut self, opts: &DecoderOptions) -> Self {
        self.reassembler = StreamReassembler::new(opts);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request `mount`, or the source table if `mount` is empty.
    ///
    /// `credentials` are `user:password` and are sent using basic authentication.
    ///
    /// # Errors
    /// Any error writing to the connection.
    pub fn request(&mut self, mount: &str, credentials: Option<&str>) -> Result<()> {
        let req = request_text(&self.host, self.port, &self.agent, mount, credentials);
        debug!(mount, auth = credentials.is_some(), "requesting");
        self.send(req.as_bytes())
    }

    /// Send raw bytes, e.g., a GGA sentence for a network RTK mount.
    ///
    /// # Errors
    /// Any error writing to the connection.
    pub fn send(&mut self, dat: &[u8]) -> Result<()> {
        self.stream.write_all(dat)?;
        trace!(len = dat.len(), "sent");
        Ok(())
    }

    /// Read until `done` returns true, the caster closes the connection, or a read times
    /// out. Returns what was read as (lossy) text.
    fn receive_until<F: Fn(&[u8]) -> bool>(&mut self, done: F) -> Result<String> {
        let mut dat: Vec<u8> = Vec::default();
        let mut buf = vec![0u8; POLL_SIZE];
        while !done(&dat) {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => dat.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => break,
                Err(err) if dat.is_empty() => return Err(err.into()),
                Err(err) => {
                    debug!("read ended: {err}");
                    break;
                }
            }
        }
        Ok(String::from_utf8_lossy(&dat).into_owned())
    }

    /// Read text until the caster closes the connection or the read timeout expires.
    ///
    /// # Errors
    /// A connection error before any data was read.
    pub fn receive_text(&mut self) -> Result<String> {
        self.receive_until(|_| false)
    }

    /// Read text until at least one line feed has been received. The text may contain
    /// more than one line.
    ///
    /// # Errors
    /// A connection error before any data was read.
    pub fn receive_line(&mut self) -> Result<String> {
        self.receive_until(|dat| dat.contains(&b'\n'))
    }

    /// Poll the connection once and run one reassembly step.
    ///
    /// # Errors
    /// A connection error. Corrupt data is not an error.
    pub fn receive_rtcm(&mut self) -> Result<Option<Message>> {
        self.reassembler.receive_frame(&mut self.stream)
    }

    /// Reassembler state, e.g., for [crate::rtcm::ReassemblyStats].
    #[must_use]
    pub fn reassembler(&self) -> &StreamReassembler {
        &self.reassembler
    }

    /// Request and parse the source table, optionally filtered by country.
    ///
    /// Casters close the connection after sending the table, so a new connection is
    /// needed for a subsequent mount request.
    ///
    /// # Errors
    /// Any error writing the request or reading the response.
    pub fn source_table(&mut self, country: Option<&str>) -> Result<SourceTable> {
        self.request("", None)?;
        let text = self.receive_text()?;
        let table = SourceTable::parse(&text, country);
        debug!(
            lines = table.lines().len(),
            entries = table.len(),
            "source table"
        );
        Ok(table)
    }

    /// Shut down the connection.
    ///
    /// # Errors
    /// Any error other than the connection already being closed.
    pub fn close(self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl ByteSource for NtripClient {
    fn poll(&mut self) -> Result<Option<Vec<u8>>> {
        self.stream.poll()
    }
}
