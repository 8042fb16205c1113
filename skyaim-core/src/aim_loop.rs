//! Aim Loop
//!
//! One cycle turns the latest vehicle and operator inputs into a camera
//! command:
//!
//! ```text
//!   InputExchange ──snapshot──► AttitudeSample + AimRequest
//!                                      │
//!                                      ▼
//!                               LockOnTracker ──► world aim (theta, phi)
//!                                      │
//!                                      ▼
//!                          compensate_for_attitude ──► body aim
//!                                      │
//!                                      ▼
//!                 CameraCommand { yaw, pitch, roll, zoom } ──► CommandSink
//! ```
//!
//! The loop itself does not own a thread or a clock. Whoever drives it calls
//! [`AimLoop::step`] at the desired rate.

use std::sync::Arc;

use crate::error::AimError;
use crate::exchange::InputExchange;
use crate::lock_on::LockOnTracker;
use crate::rotation::compensate_for_attitude;
use crate::types::{AimRequest, AttitudeSample, CameraCommand};

/// Downstream consumer of camera commands (crop/pan pipeline, gimbal driver, ...)
pub trait CommandSink {
    fn apply_command(&mut self, command: &CameraCommand);
}

impl<T: CommandSink + ?Sized> CommandSink for Box<T> {
    fn apply_command(&mut self, command: &CameraCommand) {
        (**self).apply_command(command)
    }
}

/// Collects every command, mostly useful for tests and replays
impl CommandSink for Vec<CameraCommand> {
    fn apply_command(&mut self, command: &CameraCommand) {
        self.push(*command);
    }
}

/// Compute the camera command for one set of inputs.
///
/// # Arguments
/// * `attitude` - Vehicle attitude in degrees, height and position
/// * `request` - Sanitized operator request
/// * `tracker` - Lock-on state, advanced by this call
///
/// # Returns
/// The command to hand downstream. `pitch` is `sin(theta_body)`, `yaw` is the
/// body-frame bearing in degrees and `roll` counter-rotates the image so the
/// horizon stays level.
pub fn compute_command(
    attitude: &AttitudeSample,
    request: &AimRequest,
    tracker: &mut LockOnTracker,
) -> Result<CameraCommand, AimError> {
    let world = tracker.update(request, attitude)?;
    let body = compensate_for_attitude(&world, attitude.roll, attitude.yaw, attitude.pitch);

    let (sin_phi, cos_phi) = body.phi.to_radians().sin_cos();
    let roll = -attitude.roll * cos_phi - attitude.pitch * sin_phi;

    Ok(CameraCommand {
        yaw: AimError::check_finite(body.phi, "yaw")?,
        pitch: AimError::check_finite(body.theta.to_radians().sin(), "pitch")?,
        roll: AimError::check_finite(roll, "roll")?,
        zoom: request.zoom,
    })
}

/// Consumer side of the exchange.
///
/// Keeps a local copy of both inputs so that a snapshot that finds a channel
/// busy simply reuses the previous values.
#[derive(Debug)]
pub struct AimLoop {
    exchange: Arc<InputExchange>,
    attitude: AttitudeSample,
    request: AimRequest,
    tracker: LockOnTracker,
    last_command: CameraCommand,
    cycles: u64,
}

impl AimLoop {
    pub fn new(exchange: Arc<InputExchange>) -> Self {
        AimLoop {
            exchange,
            attitude: AttitudeSample::default(),
            request: AimRequest::default(),
            tracker: LockOnTracker::new(),
            last_command: CameraCommand::default(),
            cycles: 0,
        }
    }

    /// Run one cycle without emitting anything.
    pub fn cycle(&mut self) -> Result<CameraCommand, AimError> {
        self.exchange.snapshot_attitude(&mut self.attitude);
        self.exchange.snapshot_aim(&mut self.request);
        self.cycles += 1;

        let command = compute_command(&self.attitude, &self.request, &mut self.tracker)?;
        self.last_command = command;
        Ok(command)
    }

    /// Run one cycle and hand the result to `sink`.
    ///
    /// A failed cycle is logged and nothing is emitted; the previous command
    /// stays available from [`AimLoop::last_command`].
    pub fn step<S: CommandSink + ?Sized>(&mut self, sink: &mut S) -> Option<CameraCommand> {
        match self.cycle() {
            Ok(command) => {
                sink.apply_command(&command);
                Some(command)
            }
            Err(e) => {
                log::warn!("Aim cycle {} skipped: {}", self.cycles, e);
                None
            }
        }
    }

    pub fn last_command(&self) -> CameraCommand {
        self.last_command
    }

    pub fn tracker(&self) -> &LockOnTracker {
        &self.tracker
    }

    /// Number of cycles run so far, successful or not
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn exchange(&self) -> &Arc<InputExchange> {
        &self.exchange
    }
}
