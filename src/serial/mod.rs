//! # Serial Transport
//!
//! Thin collaborator over a serial port: non-blocking-poll reads and flushed
//! writes. The bridge never talks to `serialport` directly; everything goes
//! through the [`SerialLink`] trait so the protocol layer and tests can run
//! over an in-memory link.
//!
//! The port is shared as [`SharedLink`] (`Arc<Mutex<..>>`) between the frame
//! reader/writer and the keepalive task. The mutex is the single-writer
//! discipline for the wire: a response frame and a keepalive byte can never
//! interleave because each goes out under one lock acquisition.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::info;
use serialport::SerialPort;

use crate::config::SerialConfig;

/// Byte-level transport primitives the protocol layer needs.
pub trait SerialLink: Send {
    /// Number of bytes waiting in the receive buffer.
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Read whatever is currently available, up to `buf.len()` bytes.
    /// Returns `Ok(0)` when nothing is pending; never blocks for new data.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all bytes and flush them onto the wire.
    fn write_flush(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// The one transport handle shared by the bridge loop and the keepalive task.
pub type SharedLink = Arc<Mutex<Box<dyn SerialLink>>>;

impl SerialLink for Box<dyn SerialPort> {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        SerialPort::bytes_to_read(self.as_ref())
            .map(|n| n as usize)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pending = SerialLink::bytes_to_read(self)?;
        if pending == 0 {
            return Ok(0);
        }
        let want = pending.min(buf.len());
        match self.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            // A poll that races the receive buffer draining is not an error.
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_flush(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }
}

/// Open the configured serial port and wrap it as a [`SharedLink`].
///
/// Open failure is startup-fatal for the bridge; there is nothing useful it
/// can do without the terminal on the other end.
pub fn open(cfg: &SerialConfig) -> Result<SharedLink> {
    let port = open_port(cfg)?;
    info!(
        "Serial port opened: {} @ {} bps ({}{}{})",
        cfg.port, cfg.baud_rate, cfg.data_bits, parity_letter(&cfg.parity), cfg.stop_bits
    );
    Ok(Arc::new(Mutex::new(Box::new(port) as Box<dyn SerialLink>)))
}

fn open_port(cfg: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    let builder = serialport::new(cfg.port.clone(), cfg.baud_rate)
        // Short timeout keeps reads poll-friendly
        .timeout(Duration::from_millis(100))
        .data_bits(data_bits(cfg.data_bits)?)
        .stop_bits(stop_bits(cfg.stop_bits)?)
        .parity(parity(&cfg.parity)?);
    builder
        .open()
        .with_context(|| format!("Failed to open serial port {}", cfg.port))
}

fn data_bits(bits: u8) -> Result<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(anyhow!("Invalid data_bits {} (expected 5-8)", other)),
    }
}

fn stop_bits(bits: u8) -> Result<serialport::StopBits> {
    match bits {
        1 => Ok(serialport::StopBits::One),
        2 => Ok(serialport::StopBits::Two),
        other => Err(anyhow!("Invalid stop_bits {} (expected 1 or 2)", other)),
    }
}

fn parity(name: &str) -> Result<serialport::Parity> {
    match name.to_ascii_lowercase().as_str() {
        "none" => Ok(serialport::Parity::None),
        "even" => Ok(serialport::Parity::Even),
        "odd" => Ok(serialport::Parity::Odd),
        other => Err(anyhow!("Invalid parity '{}' (expected none/even/odd)", other)),
    }
}

fn parity_letter(name: &str) -> &'static str {
    match name.to_ascii_lowercase().as_str() {
        "even" => "E",
        "odd" => "O",
        _ => "N",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_parsing() {
        assert!(matches!(parity("none").unwrap(), serialport::Parity::None));
        assert!(matches!(parity("Even").unwrap(), serialport::Parity::Even));
        assert!(matches!(parity("ODD").unwrap(), serialport::Parity::Odd));
        assert!(parity("mark").is_err());
    }

    #[test]
    fn framing_parameter_bounds() {
        assert!(data_bits(8).is_ok());
        assert!(data_bits(9).is_err());
        assert!(stop_bits(1).is_ok());
        assert!(stop_bits(3).is_err());
    }
}
