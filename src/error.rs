//! Error types for the shutter driver.
//!
//! Two layers are kept apart:
//!
//! - **`TransportError`**: anything that went wrong moving bytes over the serial link
//!   (purge, write, read, timeout). Fatal to the current call, never to the controller.
//! - **`ShutterError`**: what a caller of [`ShutterController`](crate::ShutterController)
//!   sees. Wraps `TransportError` and adds the protocol-level failures (device-reported
//!   error codes, unrecognized replies) and the argument checks that reject a request
//!   before any I/O happens.
//!
//! Hosts that speak in numeric error identifiers can use [`ShutterError::code`], which
//! reproduces the identifiers the AMH200 adapter has always reported.

use std::time::Duration;
use thiserror::Error;

/// Port reconfiguration attempted after the controller completed a command cycle.
pub const ERR_PORT_CHANGE_FORBIDDEN: i32 = 10004;
/// Reply did not match any known answer format.
pub const ERR_UNRECOGNIZED_ANSWER: i32 = 10009;
/// Base added to device-reported error codes.
pub const ERR_OFFSET: i32 = 10100;

/// Convenience alias for results using the shutter error type.
pub type ShutterResult<T> = std::result::Result<T, ShutterError>;

/// Failures of the serial link itself.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial read timeout on '{port}' after {timeout:?}")]
    Timeout { port: String, timeout: Duration },

    #[error("Unexpected EOF from serial port '{port}'")]
    UnexpectedEof { port: String },

    #[error("Transport is bound to '{expected}', refusing request for '{requested}'")]
    PortMismatch { expected: String, requested: String },

    #[error("Failed to open serial port '{port}': {reason}")]
    Open { port: String, reason: String },

    #[error("Injected failure: {0}")]
    Injected(String),
}

/// Errors surfaced by [`ShutterController`](crate::ShutterController).
#[derive(Error, Debug)]
pub enum ShutterError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Device reported error code {0}")]
    Device(i32),

    #[error("Unrecognised answer received from the device")]
    UnrecognizedAnswer,

    #[error("Intensity {0} out of range (1-100)")]
    OutOfRange(u8),

    #[error("Port change forbidden after initialization")]
    PortLocked,

    #[error("Delay {0} ms is invalid; must be a non-negative number")]
    InvalidDelay(f64),

    #[error("State {0} is invalid; expected 0 (closed) or 1 (open)")]
    InvalidState(u8),

    #[error("Operation '{0}' is not supported by this device")]
    Unsupported(&'static str),
}

impl ShutterError {
    /// Numeric identifier for hosts that report errors as integers.
    ///
    /// Device codes are offset by [`ERR_OFFSET`] and otherwise passed through
    /// untouched; the meaning of individual codes is not documented by the vendor.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::PortLocked => Some(ERR_PORT_CHANGE_FORBIDDEN),
            Self::UnrecognizedAnswer => Some(ERR_UNRECOGNIZED_ANSWER),
            Self::Device(code) => Some(ERR_OFFSET.saturating_add(*code)),
            _ => None,
        }
    }
}
