//! Mock serial transport for testing
//!
//! Provides a scripted stand-in for the serial link so the controller can be
//! exercised without hardware:
//! - Queued reply lines (or timeouts), consumed one per `receive_line`
//! - One-shot failure injection for purge and send
//! - Call logging for test verification

use super::SerialTransport;
use crate::error::TransportError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum ScriptedReply {
    Line(String),
    Timeout,
}

/// Mock serial transport
///
/// Clones share state, so a test keeps one handle for scripting and
/// inspection while the controller owns another.
///
/// # Example
///
/// ```
/// use amh_shutter::transport::{MockTransport, SerialTransport};
///
/// let mut transport = MockTransport::new();
/// transport.push_reply("R");
/// transport.send("COM1", "LIGHT,100\r").unwrap();
/// assert_eq!(transport.receive_line("COM1", "\r").unwrap(), "R");
/// assert_eq!(transport.sent(), vec!["LIGHT,100\r".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    bound_port: Option<String>,
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    fail_next_purge: Arc<AtomicBool>,
    fail_next_send: Arc<AtomicBool>,
    call_log: Arc<Mutex<Vec<String>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create a mock that accepts any port name and has no replies queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that rejects requests for any port other than `port`.
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            bound_port: Some(port.into()),
            ..Self::default()
        }
    }

    /// Queue a reply line. A trailing terminator, if present, is stripped on receipt.
    pub fn push_reply(&self, line: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Line(line.into()));
    }

    /// Queue a read timeout.
    pub fn push_timeout(&self) {
        lock(&self.replies).push_back(ScriptedReply::Timeout);
    }

    /// Number of replies still queued.
    pub fn pending_replies(&self) -> usize {
        lock(&self.replies).len()
    }

    /// Make the next `purge` fail.
    pub fn inject_purge_failure(&self) {
        self.fail_next_purge.store(true, Ordering::SeqCst);
    }

    /// Make the next `send` fail.
    pub fn inject_send_failure(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Every call made, in order, e.g. `"purge COM1"`.
    pub fn call_log(&self) -> Vec<String> {
        lock(&self.call_log).clone()
    }

    /// Every command text passed to `send`, including terminators.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    fn log_call(&self, call: String) {
        lock(&self.call_log).push(call);
    }

    fn check_port(&self, port: &str) -> Result<(), TransportError> {
        match &self.bound_port {
            Some(expected) if expected != port => Err(TransportError::PortMismatch {
                expected: expected.clone(),
                requested: port.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl SerialTransport for MockTransport {
    fn purge(&mut self, port: &str) -> Result<(), TransportError> {
        self.log_call(format!("purge {}", port));
        self.check_port(port)?;
        if self.fail_next_purge.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Injected("purge".to_string()));
        }
        Ok(())
    }

    fn send(&mut self, port: &str, text: &str) -> Result<(), TransportError> {
        self.log_call(format!("send {} {}", port, text.trim_end()));
        self.check_port(port)?;
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Injected("send".to_string()));
        }
        lock(&self.sent).push(text.to_string());
        Ok(())
    }

    fn receive_line(&mut self, port: &str, terminator: &str) -> Result<String, TransportError> {
        self.log_call(format!("receive {}", port));
        self.check_port(port)?;
        match lock(&self.replies).pop_front() {
            Some(ScriptedReply::Line(line)) => Ok(line
                .strip_suffix(terminator)
                .map(str::to_string)
                .unwrap_or(line)),
            Some(ScriptedReply::Timeout) | None => Err(TransportError::Timeout {
                port: port.to_string(),
                timeout: Duration::ZERO,
            }),
        }
    }
}
