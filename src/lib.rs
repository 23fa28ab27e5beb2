//! Serial control driver for the Andor AMH200-FOS light shutter.
//!
//! This library contains the wire protocol, the shutter controller state
//! machine, and the serial transports it runs on. It is used by the
//! `amh-shutter` command-line tool and can be embedded in any host that
//! needs to open and close the light source.

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod transport;

pub use config::ShutterConfig;
pub use controller::{ShutterController, ShutterState};
pub use error::{ShutterError, ShutterResult, TransportError};
pub use protocol::CommandReply;
pub use transport::SerialTransport;
