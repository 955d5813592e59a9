use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use thiserror::Error;
use tracing::debug;

use crate::constants::BaudCode;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SerialTransportError {
    #[error("Failed to open serial port: {0}")]
    Open(#[from] serialport::Error),
    #[error("Failed to reconfigure serial port: {0}")]
    Reconfigure(#[source] serialport::Error),
}

/// Port settings. The Open Interface always runs 8N1 without flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOptions {
    pub baud: BaudCode,
    /// Per-read timeout; a read that times out surfaces as a short transfer.
    pub timeout: Duration,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud: BaudCode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct SerialTransport {
    inner: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str) -> Result<Self, SerialTransportError> {
        Self::open_with(path, SerialOptions::default())
    }

    pub fn open_with(path: &str, options: SerialOptions) -> Result<Self, SerialTransportError> {
        let port = serialport::new(path, options.baud.bps())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(options.timeout)
            .open()?;
        debug!(path, baud = %options.baud, "Serial port opened");
        Ok(Self { inner: port })
    }

    /// Switches the host side of the link, typically right after the robot
    /// has been told to change its rate.
    pub fn set_baud(&mut self, baud: BaudCode) -> Result<(), SerialTransportError> {
        self.inner
            .set_baud_rate(baud.bps())
            .map_err(SerialTransportError::Reconfigure)?;
        debug!(baud = %baud, "Serial baud rate changed");
        Ok(())
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
