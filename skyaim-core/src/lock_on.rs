//! Lock-on state machine.
//!
//! In `Direct` mode the operator's look direction is used as is. When the
//! operator engages lock-on, the ground point currently at the centre of view
//! is captured once, and from then on the aim is re-derived every cycle so
//! that this point stays centred while the vehicle moves.
//!
//! ```text
//!                 lock_on rising edge
//!                 (capture target once)
//!   ┌────────┐ ─────────────────────────► ┌──────────────────┐
//!   │ Direct │                            │ Locked { target }│ ◄─┐ lock_on held:
//!   └────────┘ ◄───────────────────────── └──────────────────┘ ──┘ re-aim only
//!                 lock_on released
//!                 (target discarded)
//! ```
//!
//! A release followed by a new lock-on between two cycles still counts as a
//! new rising edge: the exchange bumps `lock_generation` on every edge it
//! sees, and a generation the tracker has not captured yet triggers a new
//! capture even while `Locked`.
//!
//! The target lives inside the `Locked` variant, so it cannot change during a
//! session and is gone as soon as the session ends.

use std::fmt;

use crate::error::AimError;
use crate::geodesy::{coordinate_to_point, point_to_coordinate};
use crate::types::{AimAngles, AimRequest, AttitudeSample, GeoCoordinate};

/// Tracker state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LockState {
    /// Aim follows the operator's look direction
    #[default]
    Direct,
    /// Aim follows a fixed ground coordinate
    Locked { target: GeoCoordinate },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    /// Captured target, if locked
    pub fn target(&self) -> Option<GeoCoordinate> {
        match self {
            LockState::Direct => None,
            LockState::Locked { target } => Some(*target),
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Direct => write!(f, "Direct"),
            LockState::Locked { target } => write!(
                f,
                "Locked on {:.7}, {:.7}",
                target.longitude, target.latitude
            ),
        }
    }
}

/// Drives the lock-on state machine and produces the world-frame aim.
///
/// Owned by the aim loop thread; producers never see it.
#[derive(Debug, Clone, Default)]
pub struct LockOnTracker {
    state: LockState,
    /// Number of targets captured since creation
    capture_count: u64,
    /// `lock_generation` of the request the current target was captured from
    locked_generation: u64,
}

impl LockOnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    /// Apply this cycle's inputs and return the world-frame aim.
    ///
    /// If the target capture fails the tracker stays in `Direct` and the
    /// capture is attempted again on the next cycle that still requests lock-on.
    pub fn update(
        &mut self,
        request: &AimRequest,
        attitude: &AttitudeSample,
    ) -> Result<AimAngles, AimError> {
        self.transition(request, attitude)?;

        match self.state {
            LockState::Direct => Ok(request.aim()),
            LockState::Locked { target } => {
                coordinate_to_point(&attitude.coordinate, &target, attitude.height)
            }
        }
    }

    fn transition(
        &mut self,
        request: &AimRequest,
        attitude: &AttitudeSample,
    ) -> Result<(), AimError> {
        match (self.state, request.lock_on) {
            (LockState::Direct, true) => self.capture(request, attitude)?,
            (LockState::Locked { .. }, true) if request.lock_generation != self.locked_generation => {
                log::info!("Lock-on released and re-engaged since last cycle");
                self.capture(request, attitude)?;
            }
            (LockState::Locked { .. }, false) => {
                log::info!("Lock-on released, back to direct aim");
                self.state = LockState::Direct;
            }
            _ => {}
        }
        Ok(())
    }

    fn capture(&mut self, request: &AimRequest, attitude: &AttitudeSample) -> Result<(), AimError> {
        // Stays Direct if the capture fails
        self.state = LockState::Direct;
        let target = point_to_coordinate(&request.aim(), attitude.height, &attitude.coordinate)?;
        self.state = LockState::Locked { target };
        self.locked_generation = request.lock_generation;
        self.capture_count += 1;
        log::info!(
            "Lock-on engaged at theta {:.2} phi {:.2} from {:.1} m: {}",
            request.theta,
            request.phi,
            attitude.height,
            self.state
        );
        Ok(())
    }
}
