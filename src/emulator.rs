//! Synthetic producers for running without hardware.
//!
//! The vehicle flies a circle around the scenario's home coordinate with a
//! small roll and pitch wobble and publishes like an autopilot would (angles
//! in radians). The operator keeps publishing the scenario's aim request and
//! optionally engages lock-on after a delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::tick;
use log::{debug, info};
use skyaim_core::{AimInput, InputExchange, PublishOutcome, earth_radius_at_lat};

use crate::RuntimeError;
use crate::runtime::tick_period;
use crate::scenario::Scenario;

pub const VEHICLE_THREAD: &str = "vehicle";
pub const OPERATOR_THREAD: &str = "operator";

/// Autopilot style sample: angles in radians, height in meters, position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub height: f64,
    pub longitude: f64,
    pub latitude: f64,
}

/// Vehicle state `elapsed_secs` into the scenario
pub fn vehicle_state(scenario: &Scenario, elapsed_secs: f64) -> VehicleState {
    let orbit_angle = std::f64::consts::TAU * elapsed_secs / scenario.orbit_period_secs;
    let wobble_angle = std::f64::consts::TAU * elapsed_secs / scenario.wobble_period_secs;

    let radius = earth_radius_at_lat(scenario.home.latitude);
    let north = scenario.orbit_radius * orbit_angle.cos();
    let east = scenario.orbit_radius * orbit_angle.sin();
    let latitude = scenario.home.latitude + (north / radius).to_degrees();
    let longitude = scenario.home.longitude
        + (east / (radius * scenario.home.latitude.to_radians().cos())).to_degrees();

    // Clockwise orbit: heading is 90 degrees ahead of the bearing from home
    let heading = if scenario.orbit_radius > 0.0 {
        (orbit_angle + std::f64::consts::FRAC_PI_2).rem_euclid(std::f64::consts::TAU)
    } else {
        0.0
    };

    VehicleState {
        roll: scenario.roll_amplitude.to_radians() * wobble_angle.sin(),
        yaw: heading,
        pitch: scenario.pitch_amplitude.to_radians() * wobble_angle.cos(),
        height: scenario.altitude,
        longitude,
        latitude,
    }
}

/// Operator request `elapsed_secs` into the scenario
pub fn operator_input(scenario: &Scenario, elapsed_secs: f64) -> AimInput {
    let lock_on = scenario
        .lock_after_secs
        .is_some_and(|after| elapsed_secs >= after);
    AimInput {
        lock_on,
        ..scenario.operator
    }
}

/// Operator side of the emulator.
///
/// The exchange ignores the look direction of a locked request, so the
/// direction has to be published unlocked at least once before lock-on is
/// engaged. With `lockAfterSecs` at or near 0 this delays the lock by one
/// operator tick.
#[derive(Debug, Clone)]
pub struct OperatorScript {
    scenario: Scenario,
    aim_published: bool,
    locked: bool,
}

impl OperatorScript {
    pub fn new(scenario: &Scenario) -> Self {
        OperatorScript {
            scenario: scenario.clone(),
            aim_published: false,
            locked: false,
        }
    }

    pub fn publish(&mut self, exchange: &InputExchange, elapsed_secs: f64) -> PublishOutcome {
        let mut input = operator_input(&self.scenario, elapsed_secs);
        if !self.aim_published {
            input.lock_on = false;
        }

        let outcome = exchange.publish_aim(input);
        if outcome == PublishOutcome::Published {
            if input.lock_on && !self.locked {
                info!("Operator engages lock-on after {:.1} s", elapsed_secs);
            }
            self.aim_published = true;
            self.locked = input.lock_on;
        }
        outcome
    }
}

/// Producer threads feeding an [`InputExchange`]
pub struct Emulator {
    threads: Vec<(&'static str, JoinHandle<u64>)>,
}

impl Emulator {
    /// Start the vehicle and operator threads. Both stop when `running` is cleared.
    pub fn start(
        scenario: &Scenario,
        exchange: Arc<InputExchange>,
        running: Arc<AtomicBool>,
    ) -> Result<Emulator, RuntimeError> {
        let started = Instant::now();

        let vehicle = {
            let scenario = scenario.clone();
            spawn_producer(
                VEHICLE_THREAD,
                scenario.vehicle_rate_hz,
                exchange.clone(),
                running.clone(),
                started,
                move |exchange, elapsed| {
                    let state = vehicle_state(&scenario, elapsed);
                    exchange.publish_attitude(
                        state.roll,
                        state.yaw,
                        state.pitch,
                        state.height,
                        state.longitude,
                        state.latitude,
                    )
                },
            )?
        };

        let operator = {
            let mut script = OperatorScript::new(scenario);
            spawn_producer(
                OPERATOR_THREAD,
                scenario.operator_rate_hz,
                exchange,
                running,
                started,
                move |exchange, elapsed| script.publish(exchange, elapsed),
            )?
        };

        info!(
            "Emulator started: orbit {:.0} m at {:.0} m around {:.5}, {:.5}",
            scenario.orbit_radius,
            scenario.altitude,
            scenario.home.longitude,
            scenario.home.latitude
        );

        Ok(Emulator {
            threads: vec![(VEHICLE_THREAD, vehicle), (OPERATOR_THREAD, operator)],
        })
    }

    /// Wait for both producers to stop
    pub fn join(self) -> Result<(), RuntimeError> {
        for (name, handle) in self.threads {
            let published = handle
                .join()
                .map_err(|_| RuntimeError::ThreadPanicked(name.to_string()))?;
            debug!("Producer '{}' published {} samples", name, published);
        }
        Ok(())
    }
}

fn spawn_producer<F>(
    name: &'static str,
    rate_hz: u32,
    exchange: Arc<InputExchange>,
    running: Arc<AtomicBool>,
    started: Instant,
    mut publish: F,
) -> Result<JoinHandle<u64>, RuntimeError>
where
    F: FnMut(&InputExchange, f64) -> PublishOutcome + Send + 'static,
{
    let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
        let ticker = tick(tick_period(rate_hz));
        let mut published = 0u64;
        while running.load(Ordering::SeqCst) {
            if ticker.recv().is_err() {
                break;
            }
            let elapsed = started.elapsed().as_secs_f64();
            if publish(&exchange, elapsed) == PublishOutcome::Published {
                published += 1;
            }
        }
        published
    })?;
    Ok(handle)
}
