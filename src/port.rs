use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;

use crate::cli::SerialOpts;
use crate::packet::hex_dump;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 64;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("open {dev}: {source}")]
    Connection {
        dev: String,
        source: serialport::Error,
    },
    #[error("enumerating serial ports: {0}")]
    Enumerate(serialport::Error),
    #[error("serial port is not open")]
    NotOpen,
    #[error("partial write: {written}/{expected} bytes")]
    PartialWrite { written: usize, expected: usize },
    #[error("timeout waiting for response: received {received}/{expected} bytes")]
    Timeout { received: usize, expected: usize },
    #[error("command payload too long: {0} bytes")]
    PayloadTooLong(usize),
    #[error("serial i/o: {0}")]
    Io(#[from] io::Error),
}

/// Byte stream the protocol runs over. Implemented by real serial ports and by
/// in-memory links in tests.
pub trait Link: Read + Write {
    /// Number of bytes already waiting in the inbound buffer.
    fn pending(&mut self) -> io::Result<usize>;
    /// Drop everything waiting in the inbound buffer.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl Link for Box<dyn SerialPort> {
    fn pending(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        Ok(self.clear(ClearBuffer::Input)?)
    }
}

/// One open device link. Closing is idempotent; a closed connection rejects
/// every send and receive with `TransportError::NotOpen`.
pub struct Connection<L: Link = Box<dyn SerialPort>> {
    name: String,
    link: Option<L>,
    response_timeout: Duration,
}

impl Connection {
    /// Open `opts.dev` as 8N1 and wait out the device's reset jitter.
    pub fn open(opts: &SerialOpts) -> Result<Self, TransportError> {
        let port = serialport::new(&opts.dev, opts.baud)
            .timeout(Duration::from_millis(100))
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(if opts.rtscts {
                FlowControl::Hardware
            } else {
                FlowControl::None
            })
            .open()
            .map_err(|source| TransportError::Connection {
                dev: opts.dev.clone(),
                source,
            })?;

        thread::sleep(Duration::from_millis(opts.settle_ms));
        info!("[port] opened {} at {} baud 8N1", opts.dev, opts.baud);

        let mut conn = Connection::from_link(&opts.dev, port);
        conn.response_timeout = Duration::from_millis(opts.timeout_ms);
        Ok(conn)
    }
}

impl<L: Link> Connection<L> {
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn from_link(name: &str, link: L) -> Self {
        Self {
            name: name.to_string(),
            link: Some(link),
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How long a command waits for its response frame.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Write all of `bytes`. A short write is an error and is not retried.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        debug!("[tx] {}", hex_dump(bytes));
        let written = link.write(bytes)?;
        if written != bytes.len() {
            return Err(TransportError::PartialWrite {
                written,
                expected: bytes.len(),
            });
        }
        link.flush()?;
        Ok(())
    }

    /// Collect exactly `expected` bytes, polling the inbound buffer until they
    /// arrive or `timeout` elapses. Bytes past `expected` stay buffered until
    /// the next `discard_input`.
    pub fn receive(&mut self, expected: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        let start = Instant::now();
        let mut buf = Vec::with_capacity(expected);
        let mut chunk = [0u8; READ_CHUNK];

        while buf.len() < expected && start.elapsed() < timeout {
            let waiting = link.pending()?;
            if waiting == 0 {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            let want = waiting.min(READ_CHUNK).min(expected - buf.len());
            match link.read(&mut chunk[..want]) {
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
            trace!("[rx] {}/{} bytes", buf.len(), expected);
        }

        if buf.len() < expected {
            return Err(TransportError::Timeout {
                received: buf.len(),
                expected,
            });
        }
        debug!("[rx] {}", hex_dump(&buf));
        Ok(buf)
    }

    /// Throw away stale input, such as the tail of an overlong reply or a reply
    /// that arrived after its timeout.
    pub fn discard_input(&mut self) -> Result<(), TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        let stale = link.pending()?;
        if stale > 0 {
            debug!("[rx] discarding {} stale byte(s)", stale);
        }
        link.discard_input()?;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.link.take().is_some() {
            info!("[port] closed {}", self.name);
        }
    }
}

/// Device paths of the serial ports the OS reports.
pub fn list_available_ports() -> Result<Vec<String>, TransportError> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
