//! Hardware integration tests for the Andor AMH200-FOS
//!
//! These tests require a real light source connected over RS-232.
//! Run with:
//! AMH_PORT=/dev/ttyUSB0 cargo test --test hardware_amh200_test \
//!     --features hardware_tests -- --ignored --nocapture
//!
//! WARNING: these tests switch the light on. Make sure the fibre output is
//! safely terminated before running them.

#![cfg(feature = "hardware_tests")]

use amh_shutter::transport::SerialPortTransport;
use amh_shutter::{ShutterConfig, ShutterController};
use std::time::Duration;

fn connect() -> ShutterController<SerialPortTransport> {
    let config = ShutterConfig::load(None).expect("Invalid AMH_* configuration");
    let transport = SerialPortTransport::open(&config.port, config.baud_rate, config.timeout())
        .expect("Failed to open serial port");
    let mut shutter = ShutterController::new(transport);
    shutter.set_port(config.port.clone()).unwrap();
    shutter.initialize().expect("Device did not acknowledge initial close");
    shutter
}

#[test]
#[ignore] // Hardware-only test
fn test_open_close_cycle() {
    let mut shutter = connect();
    shutter.set_delay_ms(100.0).unwrap();

    shutter.set_open(true).unwrap();
    assert!(shutter.is_open());
    assert!(shutter.is_busy());

    std::thread::sleep(Duration::from_millis(150));
    assert!(!shutter.is_busy());

    shutter.set_open(false).unwrap();
    assert!(!shutter.is_open());
    shutter.shutdown().unwrap();
}

#[test]
#[ignore]
fn test_intensity_sweep() {
    let mut shutter = connect();
    shutter.set_open(true).unwrap();

    for level in [1u8, 25, 50, 75, 100] {
        println!("Setting intensity to {}%", level);
        shutter.set_intensity(level).unwrap();
        assert_eq!(shutter.intensity(), level);
        std::thread::sleep(Duration::from_millis(200));
    }

    shutter.shutdown().unwrap();
}
