//! Serial transport capability
//!
//! The controller talks to the device only through [`SerialTransport`]. The trait
//! mirrors the three calls a command cycle needs: drop stale input, write a
//! command, block for one terminated reply line.
//!
//! Implementations:
//! - [`SerialPortTransport`] - RS-232 via the `serialport` crate (feature `instrument_serial`)
//! - [`MockTransport`] - scripted replies and failure injection for tests

pub mod mock;
#[cfg(feature = "instrument_serial")]
pub mod serial;

pub use mock::MockTransport;
#[cfg(feature = "instrument_serial")]
pub use serial::SerialPortTransport;

use crate::error::TransportError;

/// Blocking line-oriented serial link.
///
/// Every call names the port it is meant for; an implementation bound to a
/// single port rejects requests for any other.
pub trait SerialTransport {
    /// Discard any unread input and unsent output.
    fn purge(&mut self, port: &str) -> Result<(), TransportError>;

    /// Write `text` verbatim. The caller appends the line terminator.
    fn send(&mut self, port: &str, text: &str) -> Result<(), TransportError>;

    /// Block until a line ending in `terminator` arrives or the configured timeout
    /// expires. The returned line has the terminator stripped.
    fn receive_line(&mut self, port: &str, terminator: &str) -> Result<String, TransportError>;
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn purge(&mut self, port: &str) -> Result<(), TransportError> {
        (**self).purge(port)
    }

    fn send(&mut self, port: &str, text: &str) -> Result<(), TransportError> {
        (**self).send(port, text)
    }

    fn receive_line(&mut self, port: &str, terminator: &str) -> Result<String, TransportError> {
        (**self).receive_line(port, terminator)
    }
}
