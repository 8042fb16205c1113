//! # SkyAim
//!
//! Host side of the gimbal aim controller: command line, threads, command
//! sinks and a built-in emulator for the vehicle and the operator.
//!
//! ## Architecture
//!
//! The aim math lives in [`skyaim_core`]. This crate only wires it to threads:
//!
//! ```text
//! ┌───────────────────────┐      ┌────────────────────────┐
//! │ vehicle producer      │      │ operator producer      │
//! │ (emulator::Vehicle)   │      │ (emulator::Operator)   │
//! └──────────┬────────────┘      └───────────┬────────────┘
//!            │ publish_attitude              │ publish_aim
//!            ▼                               ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │        InputExchange (Arc, try_lock, never blocks)      │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ snapshot, once per tick
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │  "aim-loop" thread: crossbeam tick ─► AimLoop::step     │
//! └──────────────────────────┬──────────────────────────────┘
//!                            ▼
//!                 LogSink / JsonLinesSink
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all options. Key options:
//!
//! - `-v` / `-q` - Increase or decrease verbosity
//! - `--rate` - Aim loop rate in Hz (default: 100)
//! - `--once` - Compute a single command from the given inputs and exit
//! - `--output` - Write every command as a JSON line to stdout
//! - `--scenario` - Emulator scenario file (JSON)

use std::path::PathBuf;

use clap::Parser;
use skyaim_core::{AimError, AimInput, AimLoop, CameraCommand, InputExchange};
use std::sync::Arc;
use thiserror::Error;

pub mod emulator;
pub mod runtime;
pub mod scenario;
pub mod sink;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default aim loop rate in Hz
pub const DEFAULT_RATE_HZ: u32 = 100;

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Aim loop rate in Hz
    #[arg(long, default_value_t = DEFAULT_RATE_HZ, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub rate: u32,

    /// Compute a single command from the inputs below, print it and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Vehicle roll in degrees (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub roll: f64,

    /// Vehicle pitch in degrees (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pitch: f64,

    /// Vehicle yaw in degrees, clockwise from north (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub yaw: f64,

    /// Height above ground in meters (--once)
    #[arg(long, default_value_t = 1.0)]
    pub height: f64,

    /// Vehicle longitude in degrees (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub longitude: f64,

    /// Vehicle latitude in degrees (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Degrees from straight down (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub theta: f64,

    /// Bearing in degrees, clockwise from north (--once)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub phi: f64,

    /// Engage lock-on on the point in view (--once)
    #[arg(long, default_value_t = false)]
    pub lock_on: bool,

    /// Zoom factor, 2 to 50 (--once)
    #[arg(long, default_value_t = 2.0)]
    pub zoom: f64,

    /// Write every camera command as a JSON line to stdout
    #[arg(long, default_value_t = false)]
    pub output: bool,

    /// Emulator scenario file (JSON), built-in defaults when absent
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Stop after this many aim cycles
    #[arg(long)]
    pub cycles: Option<u64>,
}

impl Cli {
    /// Publish the `--once` inputs into `exchange`.
    ///
    /// The look direction is published before lock-on is engaged, otherwise
    /// the exchange would keep its default direction and lock on to that.
    pub fn seed(&self, exchange: &InputExchange) {
        exchange.publish_attitude(
            self.roll.to_radians(),
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.height,
            self.longitude,
            self.latitude,
        );
        let input = AimInput {
            theta: self.theta,
            phi: self.phi,
            lock_on: false,
            zoom: self.zoom,
        };
        exchange.publish_aim(input);
        if self.lock_on {
            exchange.publish_aim(AimInput {
                lock_on: true,
                ..input
            });
        }
    }
}

/// Run a single compute-only cycle from the command line inputs
pub fn run_once(args: &Cli) -> Result<CameraCommand, RuntimeError> {
    let exchange = Arc::new(InputExchange::new());
    args.seed(&exchange);
    let mut aim_loop = AimLoop::new(exchange);
    Ok(aim_loop.cycle()?)
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse scenario: {0}")]
    Scenario(#[from] serde_json::Error),
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("Thread '{0}' panicked")]
    ThreadPanicked(String),
    #[error(transparent)]
    Aim(#[from] AimError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = Cli::parse_from(["skyaim"]);
        assert_eq!(args.rate, 100);
        assert!(!args.once);
        assert!(!args.output);
        assert_eq!(args.zoom, 2.0);
        assert_eq!(args.height, 1.0);
        assert!(args.cycles.is_none());
    }

    #[test]
    fn test_cli_rate_bounds() {
        assert!(Cli::try_parse_from(["skyaim", "--rate", "0"]).is_err());
        assert!(Cli::try_parse_from(["skyaim", "--rate", "1001"]).is_err());
        assert_eq!(Cli::parse_from(["skyaim", "--rate", "250"]).rate, 250);
    }

    #[test]
    fn test_run_once_level() {
        let args = Cli::parse_from([
            "skyaim", "--once", "--height", "50", "--theta", "30", "--phi", "90", "--zoom", "5",
        ]);
        let command = run_once(&args).unwrap();
        assert!((command.yaw - 90.0).abs() < 1e-9);
        assert!((command.pitch - 0.5).abs() < 1e-9);
        assert!(command.roll.abs() < 1e-9);
        assert_eq!(command.zoom, 5.0);
    }

    #[test]
    fn test_run_once_with_lock_on_and_negative_angles() {
        let args = Cli::parse_from([
            "skyaim",
            "--once",
            "--height",
            "80",
            "--latitude",
            "-33.9",
            "--yaw",
            "-30",
            "--theta",
            "40",
            "--phi",
            "60",
            "--lock-on",
        ]);
        assert_eq!(args.yaw, -30.0);
        let command = run_once(&args).unwrap();
        // Vehicle turned 30 degrees counter-clockwise: target appears 30 degrees further right
        assert!((command.yaw - 90.0).abs() < 1e-6);
        assert!((command.pitch - 40f64.to_radians().sin()).abs() < 1e-6);
    }
}
