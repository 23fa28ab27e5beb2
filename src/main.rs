//! Command-line control of an Andor AMH200-FOS light shutter.
//!
//! ```text
//! amh-shutter --config shutter.toml open --intensity 60
//! amh-shutter --port /dev/ttyUSB0 close
//! RUST_LOG=amh_shutter=debug amh-shutter status
//! ```

use amh_shutter::clock::SystemClock;
use amh_shutter::transport::SerialPortTransport;
use amh_shutter::{ShutterConfig, ShutterController};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "amh-shutter", version, about = "Control an Andor AMH200-FOS light shutter")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overriding the configuration
    #[arg(short, long)]
    port: Option<String>,

    /// Settle delay in milliseconds, overriding the configuration
    #[arg(long)]
    delay_ms: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Turn the light on and leave it on
    Open {
        /// Intensity in percent (1-100)
        #[arg(short, long)]
        intensity: Option<u8>,
    },
    /// Turn the light off
    Close,
    /// Turn the light on at the given intensity and leave it on
    Intensity {
        /// Intensity in percent (1-100)
        level: u8,
    },
    /// Close the shutter and report the controller state
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        ShutterConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.delay_ms = delay_ms;
    }
    config.validate().context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let transport = SerialPortTransport::open(&config.port, config.baud_rate, config.timeout())
        .with_context(|| format!("Failed to open AMH200 on '{}'", config.port))?;
    info!(
        "Opened '{}' at {} baud, reply timeout {:?}",
        transport.port_name(),
        config.baud_rate,
        transport.timeout()
    );
    let mut shutter = ShutterController::from_config(transport, SystemClock, &config)?;

    shutter.initialize().with_context(|| {
        format!("AMH200 on '{}' did not accept the closing command", config.port)
    })?;

    match cli.command {
        Command::Open { intensity } => {
            if let Some(level) = intensity {
                shutter.set_intensity(level)?;
            }
            shutter.set_open(true).context("Failed to open shutter")?;
            print_state(&shutter);
            shutter.detach();
        }
        Command::Intensity { level } => {
            shutter.set_intensity(level)?;
            shutter.set_open(true).context("Failed to open shutter")?;
            print_state(&shutter);
            shutter.detach();
        }
        Command::Close => {
            shutter.set_open(false).context("Failed to close shutter")?;
            print_state(&shutter);
            shutter.shutdown()?;
        }
        Command::Status => {
            print_state(&shutter);
            shutter.shutdown()?;
        }
    }

    Ok(())
}

fn print_state(shutter: &ShutterController<SerialPortTransport, SystemClock>) {
    let state = shutter.snapshot();
    println!("Port:      {}", state.port);
    println!("State:     {}", if state.open { "open" } else { "closed" });
    println!("Intensity: {}", state.intensity);
    println!("Delay:     {} ms", state.delay_ms);
    println!("Busy:      {}", shutter.is_busy());
}
