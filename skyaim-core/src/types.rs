//! Aim Type Definitions
//!
//! Value types exchanged between the vehicle producer, the operator producer,
//! the aim loop and the downstream camera consumer.

use serde::{Deserialize, Serialize};

/// Height assumed until the vehicle reports a valid one, in meters
pub const DEFAULT_HEIGHT_M: f64 = 1.0;

/// Smallest zoom factor the camera pipeline accepts
pub const MIN_ZOOM: f64 = 2.0;

/// Largest zoom factor the camera pipeline accepts
pub const MAX_ZOOM: f64 = 50.0;

/// Exclusive upper bound for theta (90 degrees would look at the horizon)
pub const THETA_LIMIT_DEG: f64 = 90.0;

/// Value stored when the operator asks for theta at or beyond the horizon
pub const THETA_CLAMP_DEG: f64 = 89.0;

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoCoordinate {
    /// Longitude in degrees (east positive)
    pub longitude: f64,
    /// Latitude in degrees (north positive)
    pub latitude: f64,
}

impl GeoCoordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        GeoCoordinate {
            longitude,
            latitude,
        }
    }
}

/// Spherical aim direction
///
/// `theta` is measured from straight down (0 = nadir), `phi` is the bearing
/// from north, clockwise, both in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AimAngles {
    pub theta: f64,
    pub phi: f64,
}

impl AimAngles {
    pub fn new(theta: f64, phi: f64) -> Self {
        AimAngles { theta, phi }
    }
}

/// Vehicle attitude and position as seen by the aim loop
///
/// Angles are stored in degrees. The producer supplies radians, see
/// [`crate::exchange::InputExchange::publish_attitude`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttitudeSample {
    /// Rotation about the body y-axis in degrees
    pub roll: f64,
    /// Rotation about the body x-axis in degrees
    pub pitch: f64,
    /// Rotation about the z-axis in degrees, positive clockwise seen from above
    pub yaw: f64,
    /// Meters above the reference surface, always > 0
    pub height: f64,
    /// Current vehicle position
    pub coordinate: GeoCoordinate,
}

impl Default for AttitudeSample {
    fn default() -> Self {
        AttitudeSample {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            height: DEFAULT_HEIGHT_M,
            coordinate: GeoCoordinate::default(),
        }
    }
}

/// Operator aim request after sanitization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AimRequest {
    /// Degrees from nadir, always in [0, 90)
    pub theta: f64,
    /// Bearing in degrees, taken verbatim
    pub phi: f64,
    /// Hold the camera on the ground point currently in view
    pub lock_on: bool,
    /// Zoom factor, always in [MIN_ZOOM, MAX_ZOOM]
    pub zoom: f64,
    /// Bumped by every published lock-on rising edge, so an edge is not lost
    /// when a release and re-lock both land between two snapshots
    #[serde(default)]
    pub lock_generation: u64,
}

impl Default for AimRequest {
    fn default() -> Self {
        AimRequest {
            theta: 0.0,
            phi: 0.0,
            lock_on: false,
            zoom: MIN_ZOOM,
            lock_generation: 0,
        }
    }
}

impl AimRequest {
    pub fn aim(&self) -> AimAngles {
        AimAngles::new(self.theta, self.phi)
    }
}

/// Command handed to the downstream camera/crop pipeline once per cycle
///
/// `pitch` is the projected scalar `sin(theta_body)`, not an angle. `yaw` is
/// the body-frame bearing in degrees and `roll` the horizon-levelling term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCommand {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub zoom: f64,
}

impl Default for CameraCommand {
    fn default() -> Self {
        CameraCommand {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            zoom: MIN_ZOOM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let attitude = AttitudeSample::default();
        assert_eq!(attitude.height, 1.0);
        assert_eq!(attitude.coordinate, GeoCoordinate::new(0.0, 0.0));

        let aim = AimRequest::default();
        assert_eq!(aim.zoom, 2.0);
        assert!(!aim.lock_on);
    }

    #[test]
    fn test_attitude_serializes_camel_case() {
        let json = serde_json::to_value(AttitudeSample::default()).unwrap();
        assert_eq!(json["height"], 1.0);
        assert_eq!(json["coordinate"]["longitude"], 0.0);

        let aim: AimRequest =
            serde_json::from_str(r#"{"theta":30.0,"phi":90.0,"lockOn":true,"zoom":4.0}"#).unwrap();
        assert!(aim.lock_on);
        assert_eq!(aim.lock_generation, 0);
        assert_eq!(aim.aim(), AimAngles::new(30.0, 90.0));
    }
}
