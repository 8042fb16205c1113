//! Emulator scenario
//!
//! Describes the synthetic flight and operator behaviour used when no real
//! autopilot or operator console is attached. Every field has a default, so
//! a scenario file only needs to list what it changes:
//!
//! ```json
//! {
//!   "home": { "longitude": 18.07, "latitude": 59.33 },
//!   "altitude": 60.0,
//!   "operator": { "theta": 35.0, "phi": 90.0, "zoom": 4.0 },
//!   "lockAfterSecs": 5.0
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skyaim_core::{AimInput, GeoCoordinate};

use crate::RuntimeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    /// Centre of the orbit
    pub home: GeoCoordinate,
    /// Height above ground in meters
    pub altitude: f64,
    /// Orbit radius in meters, 0 to hover
    pub orbit_radius: f64,
    /// Time for one full orbit in seconds
    pub orbit_period_secs: f64,
    /// Peak roll wobble in degrees
    pub roll_amplitude: f64,
    /// Peak pitch wobble in degrees
    pub pitch_amplitude: f64,
    /// Period of the attitude wobble in seconds
    pub wobble_period_secs: f64,
    /// How often the vehicle publishes, in Hz
    pub vehicle_rate_hz: u32,
    /// How often the operator publishes, in Hz
    pub operator_rate_hz: u32,
    /// What the operator asks for
    pub operator: AimInput,
    /// Engage lock-on this many seconds after start, never when absent
    pub lock_after_secs: Option<f64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            home: GeoCoordinate::new(11.9746, 57.7089),
            altitude: 50.0,
            orbit_radius: 40.0,
            orbit_period_secs: 60.0,
            roll_amplitude: 3.0,
            pitch_amplitude: 2.0,
            wobble_period_secs: 4.0,
            vehicle_rate_hz: 50,
            operator_rate_hz: 10,
            operator: AimInput {
                theta: 30.0,
                phi: 0.0,
                ..Default::default()
            },
            lock_after_secs: None,
        }
    }
}

impl Scenario {
    /// Read and validate a scenario file
    pub fn load(path: &Path) -> Result<Scenario, RuntimeError> {
        let file = File::open(path)?;
        let scenario: Scenario = serde_json::from_reader(BufReader::new(file))?;
        scenario.validate()?;
        log::info!("Loaded scenario from {}", path.display());
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if !(self.altitude.is_finite() && self.altitude > 0.0) {
            return Err(RuntimeError::InvalidScenario(format!(
                "altitude must be positive, got {}",
                self.altitude
            )));
        }
        if !(self.orbit_radius.is_finite() && self.orbit_radius >= 0.0) {
            return Err(RuntimeError::InvalidScenario(format!(
                "orbitRadius must not be negative, got {}",
                self.orbit_radius
            )));
        }
        for (name, secs) in [
            ("orbitPeriodSecs", self.orbit_period_secs),
            ("wobblePeriodSecs", self.wobble_period_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(RuntimeError::InvalidScenario(format!(
                    "{} must be positive, got {}",
                    name, secs
                )));
            }
        }
        for (name, hz) in [
            ("vehicleRateHz", self.vehicle_rate_hz),
            ("operatorRateHz", self.operator_rate_hz),
        ] {
            if !(1..=1000).contains(&hz) {
                return Err(RuntimeError::InvalidScenario(format!(
                    "{} must be between 1 and 1000, got {}",
                    name, hz
                )));
            }
        }
        if let Some(secs) = self.lock_after_secs {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(RuntimeError::InvalidScenario(format!(
                    "lockAfterSecs must be a non-negative number, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }
}
