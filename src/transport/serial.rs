//! RS-232 transport for the AMH200
//!
//! Wraps the `serialport` crate. All calls block the current thread; the
//! controller is synchronous and owns this transport exclusively.

use super::SerialTransport;
use crate::error::TransportError;
use serialport::{ClearBuffer, SerialPort};
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-read timeout on the OS port; the overall line timeout is enforced on top.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial transport bound to one named port.
pub struct SerialPortTransport {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// Maximum time to wait for a complete reply line
    timeout: Duration,

    port: Box<dyn SerialPort>,
}

impl SerialPortTransport {
    /// Open `port_name` at `baud_rate`, 8N1, no flow control.
    ///
    /// # Errors
    /// Returns [`TransportError::Open`] if the port cannot be opened.
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(POLL_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Open {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Serial port '{}' opened at {} baud", port_name, baud_rate);

        Ok(Self {
            port_name: port_name.to_string(),
            timeout,
            port,
        })
    }

    /// Name of the port this transport is bound to.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Overall reply timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn check_port(&self, port: &str) -> Result<(), TransportError> {
        if port != self.port_name {
            return Err(TransportError::PortMismatch {
                expected: self.port_name.clone(),
                requested: port.to_string(),
            });
        }
        Ok(())
    }
}

impl SerialTransport for SerialPortTransport {
    fn purge(&mut self, port: &str) -> Result<(), TransportError> {
        self.check_port(port)?;
        self.port
            .clear(ClearBuffer::All)
            .map_err(|e| TransportError::Io(e.into()))
    }

    fn send(&mut self, port: &str, text: &str) -> Result<(), TransportError> {
        self.check_port(port)?;
        self.port.write_all(text.as_bytes())?;
        self.port.flush()?;
        debug!("Sent serial command: {}", text.trim_end());
        Ok(())
    }

    fn receive_line(&mut self, port: &str, terminator: &str) -> Result<String, TransportError> {
        self.check_port(port)?;

        let terminator = terminator.as_bytes();
        let mut response: Vec<u8> = Vec::new();
        let mut buffer = [0u8; 1];
        let start = Instant::now();

        loop {
            if start.elapsed() > self.timeout {
                return Err(TransportError::Timeout {
                    port: self.port_name.clone(),
                    timeout: self.timeout,
                });
            }

            match self.port.read(&mut buffer) {
                Ok(1) => {
                    response.push(buffer[0]);
                    if !terminator.is_empty() && response.ends_with(terminator) {
                        response.truncate(response.len() - terminator.len());
                        break;
                    }
                }
                Ok(0) => {
                    return Err(TransportError::UnexpectedEof {
                        port: self.port_name.clone(),
                    });
                }
                Ok(_) => unreachable!("Read into single-byte buffer returned >1"),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let line = String::from_utf8_lossy(&response).into_owned();
        debug!("Received serial response: {}", line);
        Ok(line)
    }
}
