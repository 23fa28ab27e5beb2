//! End-to-end command cycles against the scripted transport.

use amh_shutter::clock::ManualClock;
use amh_shutter::transport::MockTransport;
use amh_shutter::{ShutterConfig, ShutterController, ShutterError};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn new_shutter() -> (
    ShutterController<MockTransport, ManualClock>,
    MockTransport,
    ManualClock,
) {
    let transport = MockTransport::new();
    let clock = ManualClock::new();
    let shutter = ShutterController::with_clock(transport.clone(), clock.clone());
    (shutter, transport, clock)
}

#[test]
fn test_open_with_default_settings() {
    let (mut shutter, transport, _clock) = new_shutter();
    transport.push_reply("R");

    shutter.set_open(true).unwrap();

    assert!(shutter.is_open());
    // Delay defaults to zero, so the busy window is already over
    assert!(!shutter.is_busy());
    assert_eq!(transport.sent(), vec!["LIGHT,100\r"]);
    shutter.detach();
}

#[test]
fn test_device_error_leaves_shutter_closed() {
    let (mut shutter, transport, _clock) = new_shutter();
    transport.push_reply("E,5");

    let err = shutter.set_open(true).unwrap_err();

    assert!(matches!(err, ShutterError::Device(5)));
    assert!(!shutter.is_open());
    shutter.detach();
}

#[test]
fn test_open_close_cycle_with_settle_delay() {
    let (mut shutter, transport, clock) = new_shutter();
    shutter.set_delay_ms(30.0).unwrap();
    shutter.set_intensity(45).unwrap();

    transport.push_reply("R");
    shutter.set_open(true).unwrap();
    assert!(shutter.is_open());
    assert!(shutter.is_busy());

    clock.advance(Duration::from_millis(30));
    assert!(!shutter.is_busy());

    transport.push_reply("R");
    shutter.set_open(false).unwrap();
    assert!(!shutter.is_open());
    assert!(shutter.is_busy());

    assert_eq!(transport.sent(), vec!["LIGHT,45\r", "LIGHT,0\r"]);
    shutter.detach();
}

#[test]
fn test_port_change_rejected_after_first_ack() {
    let transport = MockTransport::for_port("/dev/ttyUSB2");
    let mut shutter = ShutterController::with_clock(transport.clone(), ManualClock::new());

    // Wrong port: the transport refuses and nothing gets locked
    let err = shutter.set_open(true).unwrap_err();
    assert!(matches!(err, ShutterError::Transport(_)));

    shutter.set_port("/dev/ttyUSB2".to_string()).unwrap();
    transport.push_reply("R");
    shutter.initialize().unwrap();

    let err = shutter.set_port("/dev/ttyUSB3".to_string()).unwrap_err();
    assert!(matches!(err, ShutterError::PortLocked));
    assert_eq!(err.code(), Some(10004));
    assert_eq!(shutter.port(), "/dev/ttyUSB2");
    shutter.detach();
}

#[test]
fn test_recovers_after_unrecognized_answer() {
    let (mut shutter, transport, _clock) = new_shutter();
    transport.push_reply("?");
    transport.push_reply("R");

    assert!(matches!(
        shutter.set_open(true),
        Err(ShutterError::UnrecognizedAnswer)
    ));
    assert!(!shutter.is_open());

    // No internal retry: the caller decides to try again
    assert_eq!(transport.sent().len(), 1);
    shutter.set_open(true).unwrap();
    assert!(shutter.is_open());
    shutter.detach();
}

#[test]
fn test_dropping_controller_closes_light() {
    let (mut shutter, transport, _clock) = new_shutter();
    transport.push_reply("R");
    shutter.set_open(true).unwrap();

    transport.push_reply("R");
    drop(shutter);

    assert_eq!(transport.sent(), vec!["LIGHT,100\r", "LIGHT,0\r"]);
    assert_eq!(transport.pending_replies(), 0);
}

#[test]
fn test_shared_controller_behind_mutex() {
    let (shutter, transport, _clock) = new_shutter();
    let shutter = Arc::new(Mutex::new(shutter));

    for _ in 0..4 {
        transport.push_reply("R");
    }

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shutter = Arc::clone(&shutter);
            std::thread::spawn(move || {
                let mut shutter = shutter.lock().unwrap();
                shutter.set_open(i % 2 == 0).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every cycle ran purge-send-receive without interleaving
    let log = transport.call_log();
    assert_eq!(log.len(), 12);
    for cycle in log.chunks(3) {
        assert!(cycle[0].starts_with("purge"));
        assert!(cycle[1].starts_with("send"));
        assert!(cycle[2].starts_with("receive"));
    }

    let shutter = Arc::try_unwrap(shutter)
        .ok()
        .unwrap()
        .into_inner()
        .unwrap();
    shutter.detach();
}

#[test]
fn test_controller_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"COM6\"\ndelay_ms = 12.0\nintensity = 33").unwrap();

    let config = ShutterConfig::load(Some(file.path())).unwrap();
    let transport = MockTransport::for_port("COM6");
    let mut shutter =
        ShutterController::from_config(transport.clone(), ManualClock::new(), &config).unwrap();

    transport.push_reply("R");
    shutter.set_open(true).unwrap();

    assert_eq!(transport.sent(), vec!["LIGHT,33\r"]);
    assert_eq!(shutter.delay_ms(), 12.0);
    assert!(shutter.is_busy());
    shutter.detach();
}
