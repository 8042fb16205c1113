//! Latest-value input exchange between producer threads and the aim loop.
//!
//! There is one channel per producer: the vehicle adapter publishes attitude
//! samples, the operator adapter publishes aim requests. The aim loop takes a
//! snapshot of both once per cycle.
//!
//! ```text
//! vehicle thread ──publish_attitude──►┌───────────────┐
//!                                     │ InputExchange │──snapshot──► aim loop
//! operator thread ──publish_aim──────►└───────────────┘
//! ```
//!
//! # Contention
//!
//! Nothing here ever blocks. Each channel is a single slot behind a mutex that
//! is only ever taken with `try_lock`:
//!
//! - a publish that finds the slot busy is dropped (never queued or retried),
//! - a snapshot that finds the slot busy leaves the loop's previous copy as is.
//!
//! Only the most recent sample matters for continuous control, so losing a
//! value in a burst is acceptable. Drops are counted, see [`ExchangeStats`].
//!
//! # Sanitization
//!
//! Values are normalized on the way in, so everything the loop reads already
//! satisfies the data model invariants:
//!
//! | Field   | Rule                                                     |
//! |---------|----------------------------------------------------------|
//! | theta   | `< 0` becomes 0, `>= 90` becomes 89                      |
//! | zoom    | accepted only within [2, 50], otherwise previous kept    |
//! | height  | accepted only when `> 0`, otherwise previous kept        |
//! | any     | NaN or infinite values are ignored, previous kept        |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, TryLockError};

use serde::{Deserialize, Serialize};

use crate::types::{
    AimRequest, AttitudeSample, MAX_ZOOM, MIN_ZOOM, THETA_CLAMP_DEG, THETA_LIMIT_DEG,
};

/// Result of a publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Values were written to the slot
    Published,
    /// Another publish or a snapshot held the slot; the values were discarded
    Dropped,
}

/// Raw operator input, before clamping
///
/// `Default` gives the operator defaults: looking straight down, north, no
/// lock-on, zoom 2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AimInput {
    pub theta: f64,
    pub phi: f64,
    pub lock_on: bool,
    pub zoom: f64,
}

impl Default for AimInput {
    fn default() -> Self {
        AimInput {
            theta: 0.0,
            phi: 0.0,
            lock_on: false,
            zoom: MIN_ZOOM,
        }
    }
}

/// Contention counters for both channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeStats {
    pub attitude_dropped: u64,
    pub attitude_stale: u64,
    pub aim_dropped: u64,
    pub aim_stale: u64,
}

/// Clamp an operator theta into [0, 90)
#[inline]
pub fn clamp_theta(theta: f64) -> f64 {
    if theta < 0.0 {
        0.0
    } else if theta >= THETA_LIMIT_DEG {
        THETA_CLAMP_DEG
    } else {
        theta
    }
}

/// Check whether a zoom factor is within what the camera accepts
#[inline]
pub fn zoom_in_range(zoom: f64) -> bool {
    (MIN_ZOOM..=MAX_ZOOM).contains(&zoom)
}

fn set_if_finite(field: &mut f64, value: f64) {
    if value.is_finite() {
        *field = value;
    }
}

// =============================================================================
// Slot
// =============================================================================

/// Single value slot that never blocks its callers
#[derive(Debug)]
struct Slot<T> {
    value: Mutex<T>,
    dropped: AtomicU64,
    stale: AtomicU64,
}

impl<T: Copy> Slot<T> {
    fn new(value: T) -> Self {
        Slot {
            value: Mutex::new(value),
            dropped: AtomicU64::new(0),
            stale: AtomicU64::new(0),
        }
    }

    fn publish_with<F: FnOnce(&mut T)>(&self, update: F) -> PublishOutcome {
        let mut guard = match self.value.try_lock() {
            Ok(guard) => guard,
            // Plain data, a panicking holder cannot leave it half-built in a harmful way
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return PublishOutcome::Dropped;
            }
        };
        update(&mut *guard);
        PublishOutcome::Published
    }

    fn snapshot_into(&self, local: &mut T) -> bool {
        let guard = match self.value.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.stale.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };
        *local = *guard;
        true
    }
}

// =============================================================================
// InputExchange
// =============================================================================

/// Two-channel latest-value handoff shared by the producers and the aim loop.
///
/// Share it with `Arc<InputExchange>`; every method takes `&self`.
#[derive(Debug)]
pub struct InputExchange {
    attitude: Slot<AttitudeSample>,
    aim: Slot<AimRequest>,
}

impl Default for InputExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl InputExchange {
    pub fn new() -> Self {
        InputExchange {
            attitude: Slot::new(AttitudeSample::default()),
            aim: Slot::new(AimRequest::default()),
        }
    }

    /// Publish a vehicle sample.
    ///
    /// Angles are in radians as reported by the flight controller and are
    /// stored in degrees. A height that is not strictly positive is ignored.
    pub fn publish_attitude(
        &self,
        roll: f64,
        yaw: f64,
        pitch: f64,
        height: f64,
        longitude: f64,
        latitude: f64,
    ) -> PublishOutcome {
        let outcome = self.attitude.publish_with(|sample| {
            set_if_finite(&mut sample.roll, roll.to_degrees());
            set_if_finite(&mut sample.yaw, yaw.to_degrees());
            set_if_finite(&mut sample.pitch, pitch.to_degrees());
            if height.is_finite() && height > 0.0 {
                sample.height = height;
            }
            set_if_finite(&mut sample.coordinate.longitude, longitude);
            set_if_finite(&mut sample.coordinate.latitude, latitude);
        });
        if outcome == PublishOutcome::Dropped {
            log::trace!("Attitude sample dropped, channel busy");
        }
        outcome
    }

    /// Publish an operator request.
    ///
    /// While `lock_on` is requested the look direction is left untouched, so
    /// the lock captures whatever the operator was looking at. Zoom is applied
    /// in either case when it is in range. Each false to true transition of
    /// `lock_on` bumps [`AimRequest::lock_generation`].
    pub fn publish_aim(&self, input: AimInput) -> PublishOutcome {
        let outcome = self.aim.publish_with(|request| {
            if !input.lock_on {
                if !input.theta.is_nan() {
                    request.theta = clamp_theta(input.theta);
                }
                set_if_finite(&mut request.phi, input.phi);
            } else if !request.lock_on {
                request.lock_generation = request.lock_generation.wrapping_add(1);
            }
            request.lock_on = input.lock_on;
            if zoom_in_range(input.zoom) {
                request.zoom = input.zoom;
            }
        });
        if outcome == PublishOutcome::Dropped {
            log::trace!("Aim request dropped, channel busy");
        }
        outcome
    }

    /// Copy the latest attitude into `local`; returns false and leaves
    /// `local` untouched when the channel is busy.
    pub(crate) fn snapshot_attitude(&self, local: &mut AttitudeSample) -> bool {
        self.attitude.snapshot_into(local)
    }

    /// Copy the latest aim request into `local`; returns false and leaves
    /// `local` untouched when the channel is busy.
    pub(crate) fn snapshot_aim(&self, local: &mut AimRequest) -> bool {
        self.aim.snapshot_into(local)
    }

    pub fn stats(&self) -> ExchangeStats {
        ExchangeStats {
            attitude_dropped: self.attitude.dropped.load(Ordering::Relaxed),
            attitude_stale: self.attitude.stale.load(Ordering::Relaxed),
            aim_dropped: self.aim.dropped.load(Ordering::Relaxed),
            aim_stale: self.aim.stale.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoCoordinate;

    fn aim_of(exchange: &InputExchange) -> AimRequest {
        let mut request = AimRequest::default();
        assert!(exchange.snapshot_aim(&mut request));
        request
    }

    fn attitude_of(exchange: &InputExchange) -> AttitudeSample {
        let mut sample = AttitudeSample::default();
        assert!(exchange.snapshot_attitude(&mut sample));
        sample
    }

    #[test]
    fn test_theta_clamping() {
        let exchange = InputExchange::new();

        exchange.publish_aim(AimInput {
            theta: 95.0,
            phi: 10.0,
            ..Default::default()
        });
        let request = aim_of(&exchange);
        assert_eq!(request.theta, 89.0);
        assert_eq!(request.phi, 10.0);

        exchange.publish_aim(AimInput {
            theta: -5.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).theta, 0.0);

        exchange.publish_aim(AimInput {
            theta: 90.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).theta, 89.0);

        exchange.publish_aim(AimInput {
            theta: 42.5,
            phi: 400.0,
            ..Default::default()
        });
        let request = aim_of(&exchange);
        assert_eq!(request.theta, 42.5);
        assert_eq!(request.phi, 400.0);
    }

    #[test]
    fn test_zoom_range() {
        let exchange = InputExchange::new();

        exchange.publish_aim(AimInput {
            zoom: 1.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).zoom, 2.0);

        exchange.publish_aim(AimInput {
            zoom: 100.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).zoom, 2.0);

        exchange.publish_aim(AimInput {
            zoom: 10.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).zoom, 10.0);

        exchange.publish_aim(AimInput {
            zoom: 51.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).zoom, 10.0);

        exchange.publish_aim(AimInput {
            zoom: 50.0,
            ..Default::default()
        });
        assert_eq!(aim_of(&exchange).zoom, 50.0);
    }

    #[test]
    fn test_lock_on_keeps_look_direction() {
        let exchange = InputExchange::new();
        exchange.publish_aim(AimInput {
            theta: 30.0,
            phi: 45.0,
            ..Default::default()
        });
        exchange.publish_aim(AimInput {
            theta: 70.0,
            phi: 200.0,
            lock_on: true,
            zoom: 8.0,
        });

        let request = aim_of(&exchange);
        assert!(request.lock_on);
        assert_eq!(request.theta, 30.0);
        assert_eq!(request.phi, 45.0);
        assert_eq!(request.zoom, 8.0);
    }

    #[test]
    fn test_lock_edges_counted_at_publish() {
        let exchange = InputExchange::new();
        let lock = AimInput {
            lock_on: true,
            ..Default::default()
        };

        exchange.publish_aim(lock);
        exchange.publish_aim(lock);
        assert_eq!(aim_of(&exchange).lock_generation, 1);

        // Release, re-aim and re-lock without a snapshot in between
        exchange.publish_aim(AimInput {
            theta: 60.0,
            phi: 90.0,
            ..Default::default()
        });
        exchange.publish_aim(lock);

        let request = aim_of(&exchange);
        assert!(request.lock_on);
        assert_eq!(request.lock_generation, 2);
        assert_eq!(request.theta, 60.0);
        assert_eq!(request.phi, 90.0);
    }

    #[test]
    fn test_attitude_units_and_height_guard() {
        let exchange = InputExchange::new();
        assert_eq!(attitude_of(&exchange).height, 1.0);

        exchange.publish_attitude(
            std::f64::consts::FRAC_PI_2,
            std::f64::consts::PI,
            -std::f64::consts::FRAC_PI_4,
            25.0,
            18.0,
            59.0,
        );
        let sample = attitude_of(&exchange);
        assert!((sample.roll - 90.0).abs() < 1e-9);
        assert!((sample.yaw - 180.0).abs() < 1e-9);
        assert!((sample.pitch + 45.0).abs() < 1e-9);
        assert_eq!(sample.height, 25.0);
        assert_eq!(sample.coordinate, GeoCoordinate::new(18.0, 59.0));

        exchange.publish_attitude(0.0, 0.0, 0.0, -3.0, 18.0, 59.0);
        assert_eq!(attitude_of(&exchange).height, 25.0);

        exchange.publish_attitude(0.0, 0.0, 0.0, 0.0, 18.0, 59.0);
        assert_eq!(attitude_of(&exchange).height, 25.0);

        exchange.publish_attitude(f64::NAN, 0.0, 0.0, f64::INFINITY, 18.0, 59.0);
        let sample = attitude_of(&exchange);
        assert_eq!(sample.height, 25.0);
        assert!(sample.roll.is_finite());
    }

    #[test]
    fn test_publish_dropped_on_contention() {
        let exchange = InputExchange::new();
        exchange.publish_aim(AimInput {
            theta: 20.0,
            ..Default::default()
        });

        {
            // Simulate a publish already in progress
            let _busy = exchange.aim.value.lock().unwrap();
            let outcome = exchange.publish_aim(AimInput {
                theta: 60.0,
                ..Default::default()
            });
            assert_eq!(outcome, PublishOutcome::Dropped);
        }

        assert_eq!(aim_of(&exchange).theta, 20.0);
        assert_eq!(exchange.stats().aim_dropped, 1);
        assert_eq!(exchange.stats().attitude_dropped, 0);
    }

    #[test]
    fn test_snapshot_reuses_previous_when_busy() {
        let exchange = InputExchange::new();
        exchange.publish_attitude(0.0, 0.0, 0.0, 40.0, 1.0, 2.0);

        let mut local = AttitudeSample::default();
        assert!(exchange.snapshot_attitude(&mut local));
        assert_eq!(local.height, 40.0);

        let previous = local;
        {
            let mut busy = exchange.attitude.value.lock().unwrap();
            busy.height = 99.0;
            assert!(!exchange.snapshot_attitude(&mut local));
        }
        assert_eq!(local, previous);
        assert_eq!(exchange.stats().attitude_stale, 1);

        assert!(exchange.snapshot_attitude(&mut local));
        assert_eq!(local.height, 99.0);
    }

    #[test]
    fn test_concurrent_publishers_never_block() {
        let exchange = InputExchange::new();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let exchange = &exchange;
                scope.spawn(move || {
                    for i in 0..1000 {
                        exchange.publish_aim(AimInput {
                            theta: (worker * 1000 + i) as f64 % 120.0 - 10.0,
                            phi: i as f64,
                            ..Default::default()
                        });
                    }
                });
            }
        });

        let request = aim_of(&exchange);
        assert!(request.theta >= 0.0 && request.theta < 90.0);
        let stats = exchange.stats();
        assert_eq!(stats.attitude_dropped, 0);
    }
}
