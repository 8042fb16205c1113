//! Local Earth Model
//!
//! Converts between geographic coordinates and aim angles as seen from a
//! vehicle hovering at a given height. The earth radius is a linear
//! interpolation between the equatorial and a reduced polar radius, which is
//! good enough for the small angular offsets a camera on a drone covers.

use crate::error::AimError;
use crate::types::{AimAngles, GeoCoordinate};

/// Equatorial earth radius in meters
pub const EARTH_RADIUS_EQUATOR: f64 = 6_378_137.0;

/// Difference between equatorial and polar radius in meters
pub const RADIUS_DIFFERENCE_POLE_EQUATOR: f64 = 21_385.0;

/// Approximate earth radius in meters at the given latitude (degrees)
#[inline]
pub fn earth_radius_at_lat(lat_deg: f64) -> f64 {
    EARTH_RADIUS_EQUATOR - (lat_deg / 90.0) * RADIUS_DIFFERENCE_POLE_EQUATOR
}

fn check_height(height: f64) -> Result<f64, AimError> {
    if height.is_finite() && height > 0.0 {
        Ok(height)
    } else {
        Err(AimError::InvalidHeight(height))
    }
}

/// Calculate where to look from `origin` so that `target` is centred.
///
/// # Arguments
/// * `origin` - Vehicle position
/// * `target` - Ground coordinate to look at
/// * `height` - Vehicle height above the ground in meters
///
/// # Returns
/// Aim angles in degrees, with `phi` in [0, 360). When the target coincides
/// with the origin the bearing is undefined and reported as 0.
pub fn coordinate_to_point(
    origin: &GeoCoordinate,
    target: &GeoCoordinate,
    height: f64,
) -> Result<AimAngles, AimError> {
    let height = check_height(height)?;
    let radius = earth_radius_at_lat(origin.latitude);

    let east = (target.longitude - origin.longitude).to_radians().tan() * radius;
    let north = (target.latitude - origin.latitude).to_radians().tan() * radius;

    let phi = if east == 0.0 && north == 0.0 {
        0.0
    } else {
        east.atan2(north).to_degrees().rem_euclid(360.0)
    };
    let theta = (east.hypot(north) / height).atan().to_degrees();

    Ok(AimAngles::new(
        AimError::check_finite(theta, "theta")?,
        AimError::check_finite(phi, "phi")?,
    ))
}

/// Calculate the ground coordinate at the centre of view.
///
/// Inverse of [`coordinate_to_point`]: given the current aim, the vehicle's
/// height and position, return the coordinate the camera is looking at.
/// Used once when lock-on is engaged.
pub fn point_to_coordinate(
    aim: &AimAngles,
    height: f64,
    drone: &GeoCoordinate,
) -> Result<GeoCoordinate, AimError> {
    let height = check_height(height)?;
    let radius = earth_radius_at_lat(drone.latitude);

    let ground_distance = height * aim.theta.to_radians().tan();
    let phi_rad = aim.phi.to_radians();

    let latitude = drone.latitude.to_radians() + (ground_distance * phi_rad.cos() / radius).atan();
    let longitude =
        drone.longitude.to_radians() + (ground_distance * phi_rad.sin() / radius).atan();

    Ok(GeoCoordinate::new(
        AimError::check_finite(longitude.to_degrees(), "longitude")?,
        AimError::check_finite(latitude.to_degrees(), "latitude")?,
    ))
}
