//! Andor AMH200-FOS shutter controller
//!
//! Owns the logical shutter state and runs one blocking command cycle per
//! request:
//!
//! 1. purge stale input
//! 2. send `LIGHT,<level>`
//! 3. wait for one reply line
//! 4. restart the busy window
//! 5. commit the new state only if the device acknowledged
//!
//! The device has no query command, so [`ShutterController::is_open`] reports the
//! last *confirmed* state. Before any acknowledged command that is Closed.
//!
//! # Example
//!
//! ```
//! use amh_shutter::{clock::ManualClock, ShutterController};
//! use amh_shutter::transport::MockTransport;
//!
//! let transport = MockTransport::new();
//! transport.push_reply("R");
//!
//! let mut shutter = ShutterController::with_clock(transport.clone(), ManualClock::new());
//! shutter.set_open(true)?;
//! assert!(shutter.is_open());
//! assert_eq!(transport.sent(), vec!["LIGHT,100\r".to_string()]);
//! # shutter.detach();
//! # Ok::<(), amh_shutter::ShutterError>(())
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::ShutterConfig;
use crate::error::{ShutterError, ShutterResult};
use crate::protocol::{
    self, CommandReply, COMMAND_TERMINATOR, DEFAULT_INTENSITY, REPLY_TERMINATOR,
};
use crate::transport::SerialTransport;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Device name reported to hosts.
pub const DEVICE_NAME: &str = "AndorAMH";
/// Human-readable device description.
pub const DEVICE_DESCRIPTION: &str = "Andor AMH200-FOS shutter";
/// Port identifier used until one is configured.
pub const DEFAULT_PORT: &str = "Andor-AMH200-FOS";

/// Logical shutter state owned by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutterState {
    /// Last confirmed open/closed state
    pub open: bool,
    /// Intensity sent with open commands, always within 1..=100
    pub intensity: u8,
    /// When the most recent command was sent
    pub last_change: Instant,
    /// Settle delay in milliseconds
    pub delay_ms: f64,
    /// Serial port identifier
    pub port: String,
}

/// Controller for a single AMH200 on a serial link.
///
/// All mutating operations take `&mut self` and block until the transport
/// returns; share across threads behind a `Mutex`.
pub struct ShutterController<T: SerialTransport, C: Clock = SystemClock> {
    transport: Option<T>,
    clock: C,
    state: ShutterState,
    /// Set by the first acknowledged command; locks the port.
    initialized: bool,
    torn_down: bool,
}

impl<T: SerialTransport> ShutterController<T, SystemClock> {
    /// Create a controller using the system clock.
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock)
    }
}

impl<T: SerialTransport, C: Clock> ShutterController<T, C> {
    /// Create a controller with defaults: closed, intensity 100, no delay.
    pub fn with_clock(transport: T, clock: C) -> Self {
        let now = clock.now();
        Self {
            transport: Some(transport),
            clock,
            state: ShutterState {
                open: false,
                intensity: DEFAULT_INTENSITY,
                last_change: now,
                delay_ms: 0.0,
                port: DEFAULT_PORT.to_string(),
            },
            initialized: false,
            torn_down: false,
        }
    }

    /// Create a controller with port, delay and intensity taken from `config`.
    ///
    /// No I/O is performed. Values are checked before the controller exists, so a
    /// rejected config never triggers the teardown close.
    pub fn from_config(transport: T, clock: C, config: &ShutterConfig) -> ShutterResult<Self> {
        if !config.delay_ms.is_finite() || config.delay_ms < 0.0 {
            return Err(ShutterError::InvalidDelay(config.delay_ms));
        }
        if !protocol::intensity_in_range(config.intensity) {
            return Err(ShutterError::OutOfRange(config.intensity));
        }
        let mut controller = Self::with_clock(transport, clock);
        controller.state.port = config.port.clone();
        controller.state.delay_ms = config.delay_ms;
        controller.state.intensity = config.intensity;
        Ok(controller)
    }

    /// Command the shutter closed. On acknowledgement the port becomes locked.
    pub fn initialize(&mut self) -> ShutterResult<()> {
        info!("Initializing {} on '{}'", DEVICE_NAME, self.state.port);
        self.set_open(false)
    }

    /// Drive the light on at the stored intensity, or off.
    ///
    /// The busy window restarts once the command has been handed to the
    /// transport, whatever the outcome. The open/closed state only changes
    /// when the device acknowledges.
    ///
    /// # Errors
    /// [`ShutterError::Unsupported`] once the controller has been shut down.
    pub fn set_open(&mut self, enable: bool) -> ShutterResult<()> {
        if self.torn_down {
            return Err(ShutterError::Unsupported("command after shutdown"));
        }
        self.command_cycle(enable)
    }

    fn command_cycle(&mut self, enable: bool) -> ShutterResult<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(ShutterError::Unsupported("command after detach"));
        };
        let port = self.state.port.as_str();

        transport.purge(port)?;

        let command = protocol::encode(enable, self.state.intensity);
        debug!("[{}] Sending: {}", port, command);

        let answer = transport
            .send(port, &format!("{}{}", command, COMMAND_TERMINATOR))
            .and_then(|()| transport.receive_line(port, REPLY_TERMINATOR));

        self.state.last_change = self.clock.now();
        let answer = answer?;
        debug!("[{}] Received: {}", port, answer);

        match protocol::decode(&answer) {
            CommandReply::Ack => {
                if self.state.open != enable {
                    info!("Shutter {}", if enable { "opened" } else { "closed" });
                }
                self.state.open = enable;
                self.initialized = true;
                Ok(())
            }
            CommandReply::DeviceError(code) => {
                warn!("Error in received answer, giving code: {}", code);
                Err(ShutterError::Device(code))
            }
            CommandReply::Malformed(raw) => {
                error!(
                    "Unrecognised answer '{}' to '{}' (firmware mismatch?)",
                    raw, command
                );
                Err(ShutterError::UnrecognizedAnswer)
            }
        }
    }

    /// Last confirmed open/closed state. Never queries the device.
    pub fn is_open(&self) -> bool {
        self.state.open
    }

    /// True while the settle delay since the last command has not yet elapsed.
    pub fn is_busy(&self) -> bool {
        let elapsed = self
            .clock
            .now()
            .saturating_duration_since(self.state.last_change);
        elapsed.as_secs_f64() * 1000.0 < self.state.delay_ms
    }

    /// Store a new intensity; if the light is on, resend so it follows.
    ///
    /// # Errors
    /// [`ShutterError::OutOfRange`] outside 1..=100, before any I/O. Errors from
    /// the resend are returned, but the new intensity stays stored.
    pub fn set_intensity(&mut self, level: u8) -> ShutterResult<()> {
        if !protocol::intensity_in_range(level) {
            return Err(ShutterError::OutOfRange(level));
        }
        self.state.intensity = level;
        if self.state.open {
            return self.set_open(true);
        }
        Ok(())
    }

    /// Intensity used for open commands.
    pub fn intensity(&self) -> u8 {
        self.state.intensity
    }

    /// Set the settle delay in milliseconds.
    pub fn set_delay_ms(&mut self, ms: f64) -> ShutterResult<()> {
        if !ms.is_finite() || ms < 0.0 {
            return Err(ShutterError::InvalidDelay(ms));
        }
        self.state.delay_ms = ms;
        Ok(())
    }

    /// Settle delay in milliseconds.
    pub fn delay_ms(&self) -> f64 {
        self.state.delay_ms
    }

    /// Change the serial port. Only allowed until a command has been acknowledged.
    pub fn set_port(&mut self, id: String) -> ShutterResult<()> {
        if self.initialized {
            return Err(ShutterError::PortLocked);
        }
        if id != self.state.port {
            info!("Port set to '{}'", id);
        }
        self.state.port = id;
        Ok(())
    }

    /// Serial port identifier in use.
    pub fn port(&self) -> &str {
        &self.state.port
    }

    /// State property: 1 when open, 0 when closed.
    pub fn state(&self) -> u8 {
        u8::from(self.state.open)
    }

    /// Set the state property; 0 closes, 1 opens.
    pub fn set_state(&mut self, value: u8) -> ShutterResult<()> {
        match value {
            0 => self.set_open(false),
            1 => self.set_open(true),
            other => Err(ShutterError::InvalidState(other)),
        }
    }

    /// Timed exposure is not available on this device.
    pub fn fire(&mut self, _delta_t_ms: f64) -> ShutterResult<()> {
        Err(ShutterError::Unsupported("fire"))
    }

    /// True once a command has been acknowledged.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Owned state: open flag, intensity, last command time, delay and port.
    pub fn snapshot(&self) -> &ShutterState {
        &self.state
    }

    /// Close the shutter and tear the controller down.
    ///
    /// The controller counts as torn down even if the close fails; later
    /// calls do nothing.
    pub fn shutdown(&mut self) -> ShutterResult<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        info!("Shutting down {}: closing shutter", DEVICE_NAME);
        self.command_cycle(false)
    }

    /// Hand back the transport without sending the closing command.
    pub fn detach(mut self) -> Option<T> {
        self.torn_down = true;
        self.transport.take()
    }
}

impl<T: SerialTransport, C: Clock> Drop for ShutterController<T, C> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to close shutter during teardown: {}", e);
        }
    }
}
