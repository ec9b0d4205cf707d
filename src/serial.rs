//! Background ingestion of NMEA lines from a serial GNSS receiver.
//!
//! A single worker thread owns the read side of the device. It accumulates bytes, splits
//! them on line feeds and sends each complete line over a channel. The consumer, usually
//! [crate::nmea::NmeaDecoder], polls that channel without blocking.
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::Duration,
};

use crossbeam::channel::{unbounded, Receiver, Sender};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, error, trace};

use crate::config::SerialConfig;
use crate::prelude::*;

/// Lines longer than this without a line feed are discarded.
pub const MAX_LINE_LEN: usize = 4096;
const READ_SIZE: usize = 1024;
const PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Byte-level access to a serial device.
pub trait SerialDevice: Send {
    /// Number of bytes that can be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, dat: &[u8]) -> io::Result<()>;
    /// Discard anything received but not yet read.
    fn clear_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialDevice for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self, buf)
    }

    fn write_all(&mut self, dat: &[u8]) -> io::Result<()> {
        io::Write::write_all(self, dat)?;
        io::Write::flush(self)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        Ok(self.clear(ClearBuffer::Input)?)
    }
}

type SharedDevice = Arc<Mutex<Option<Box<dyn SerialDevice>>>>;

fn lock(device: &SharedDevice) -> MutexGuard<'_, Option<Box<dyn SerialDevice>>> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns a serial device and the worker that turns its output into lines.
pub struct SerialIngestor {
    device: SharedDevice,
    ingesting: Arc<AtomicBool>,
    lines_tx: Sender<String>,
    lines_rx: Receiver<String>,
    idle: Duration,
    close_grace: Duration,
}

impl SerialIngestor {
    /// Open `port` at `baud` using default timing.
    ///
    /// # Errors
    /// [Error::DeviceUnavailable] if the port cannot be opened.
    pub fn open(port: &str, baud: u32) -> Result<Self> {
        let config = SerialConfig::builder().port(port).baud(baud).build();
        Self::open_with(&config)
    }

    /// Open the configured port and discard any input already buffered.
    ///
    /// # Errors
    /// [Error::DeviceUnavailable] if the port cannot be opened or its input buffer
    /// cannot be cleared.
    pub fn open_with(config: &SerialConfig) -> Result<Self> {
        let mut port = serialport::new(&config.port, config.baud)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|source| Error::DeviceUnavailable {
                port: config.port.clone(),
                source,
            })?;
        discard_input(&config.port, &mut port)?;
        debug!(port = %config.port, baud = config.baud, "opened serial device");
        Ok(Self::from_device(port, config))
    }

    /// Wrap an already open device. Only the timing values of `config` are used.
    pub fn from_device<D: SerialDevice + 'static>(device: D, config: &SerialConfig) -> Self {
        let (lines_tx, lines_rx) = unbounded();
        SerialIngestor {
            device: Arc::new(Mutex::new(Some(Box::new(device)))),
            ingesting: Arc::new(AtomicBool::new(false)),
            lines_tx,
            lines_rx,
            idle: config.idle(),
            close_grace: config.close_grace(),
        }
    }

    /// Receiving side of the line queue.
    #[must_use]
    pub fn lines(&self) -> Receiver<String> {
        self.lines_rx.clone()
    }

    /// Start the ingest worker. Does nothing if it is already running.
    ///
    /// # Errors
    /// [Error::DeviceClosed] after [SerialIngestor::stop], or [Error::Io] if the thread
    /// cannot be spawned.
    pub fn start(&mut self) -> Result<()> {
        if lock(&self.device).is_none() {
            return Err(Error::DeviceClosed);
        }
        if self.ingesting.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let device = Arc::clone(&self.device);
        let ingesting = Arc::clone(&self.ingesting);
        let lines_tx = self.lines_tx.clone();
        let idle = self.idle;
        let spawned = thread::Builder::new()
            .name("serial-ingest".into())
            .spawn(move || ingest(&device, &ingesting, &lines_tx, idle));
        match spawned {
            Ok(_) => Ok(()),
            Err(err) => {
                self.ingesting.store(false, Ordering::SeqCst);
                Err(err.into())
            }
        }
    }

    /// Stop ingesting and close the device after the grace period.
    ///
    /// The worker is signalled but not joined; one that outlives the grace period finds
    /// the device gone and exits. Calling this more than once is harmless.
    pub fn stop(&mut self) {
        self.ingesting.store(false, Ordering::SeqCst);
        if lock(&self.device).is_none() {
            return;
        }
        thread::sleep(self.close_grace);
        if lock(&self.device).take().is_some() {
            debug!("closed serial device");
        }
    }

    /// Write `dat` to the device.
    ///
    /// # Errors
    /// [Error::DeviceClosed] after [SerialIngestor::stop], otherwise any device error.
    pub fn write(&self, dat: &[u8]) -> Result<()> {
        let mut guard = lock(&self.device);
        let device = guard.as_mut().ok_or(Error::DeviceClosed)?;
        device.write_all(dat)?;
        trace!(len = dat.len(), "wrote to serial device");
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        lock(&self.device).is_some()
    }

    #[must_use]
    pub fn is_ingesting(&self) -> bool {
        self.ingesting.load(Ordering::SeqCst)
    }
}

impl Drop for SerialIngestor {
    fn drop(&mut self) {
        self.ingesting.store(false, Ordering::SeqCst);
        lock(&self.device).take();
    }
}

/// Clear input already buffered by a freshly opened device.
fn discard_input<D: SerialDevice + ?Sized>(port: &str, device: &mut D) -> Result<()> {
    device
        .clear_input()
        .map_err(|err| Error::DeviceUnavailable {
            port: port.to_string(),
            source: serialport::Error::from(err),
        })
}

/// Read one batch of available bytes into `buf`, returning how many were read.
fn read_available(device: &mut dyn SerialDevice, buf: &mut [u8]) -> io::Result<usize> {
    let avail = device.bytes_available()?;
    if avail == 0 {
        return Ok(0);
    }
    let want = avail.min(buf.len());
    match device.read(&mut buf[..want]) {
        Ok(n) => Ok(n),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        Err(err) => Err(err),
    }
}

fn ingest(device: &SharedDevice, ingesting: &AtomicBool, lines: &Sender<String>, idle: Duration) {
    let mut line: Vec<u8> = Vec::default();
    let mut buf = vec![0u8; READ_SIZE];
    debug!("serial ingest started");

    while ingesting.load(Ordering::SeqCst) {
        let zult = {
            let mut guard = lock(device);
            let Some(dev) = guard.as_mut() else {
                break;
            };
            read_available(&mut **dev, &mut buf)
        };
        let num = match zult {
            Ok(num) => num,
            Err(err) => {
                error!("serial read failed: {err}");
                ingesting.store(false, Ordering::SeqCst);
                break;
            }
        };
        if num == 0 {
            thread::sleep(idle);
            continue;
        }

        line.extend_from_slice(&buf[..num]);
        while let Some(pos) = line.iter().position(|&b| b == b'\n') {
            let rest = line.split_off(pos + 1);
            let text = String::from_utf8_lossy(&line).into_owned();
            line = rest;
            if lines.send(text).is_err() {
                debug!("line consumer gone, serial ingest exiting");
                ingesting.store(false, Ordering::SeqCst);
                return;
            }
        }
        if line.len() > MAX_LINE_LEN {
            debug!(len = line.len(), "discarding unterminated line");
            line.clear();
        }
    }
    debug!("serial ingest stopped");
}
