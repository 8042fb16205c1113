//! Attitude Compensation
//!
//! Builds the vehicle rotation from the flight controller's roll, yaw and
//! pitch and uses its inverse to turn a world-frame aim direction into the
//! body-frame direction the camera has to look in.
//!
//! # Axis convention
//!
//! ```text
//!            z (up)
//!            │   y (north, forward)
//!            │  ╱
//!            │ ╱
//!            │╱
//!            └──────── x (east, right)
//! ```
//!
//! - Roll is a rotation about y, pitch about x: positive is clockwise seen
//!   from the negative side of the axis.
//! - Yaw is a rotation about z: positive is clockwise seen from above.
//!
//! An aim `(theta, phi)` maps to the unit vector
//! `(sin θ · sin φ, sin θ · cos φ, -cos θ)`, so theta = 0 points straight down
//! and phi = 0 points north.

use nalgebra::{Rotation3, Vector3};

use crate::types::AimAngles;

/// Horizontal length below which a direction is treated as straight down/up
const HORIZONTAL_EPS: f64 = 1e-12;

/// Vehicle rotation for the given attitude in degrees.
///
/// Composed as `yaw · pitch · roll`, i.e. roll is applied first. Being a
/// rotation, its inverse is its transpose.
pub fn rotation_matrix(roll: f64, yaw: f64, pitch: f64) -> Rotation3<f64> {
    let roll_rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), roll.to_radians());
    // Flight controller yaw is clockwise from above, the opposite of a right-handed z rotation
    let yaw_rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), -yaw.to_radians());
    let pitch_rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), pitch.to_radians());

    yaw_rotation * pitch_rotation * roll_rotation
}

/// Convert an aim in degrees to a unit direction vector
pub fn angular_to_unit_vector(aim: &AimAngles) -> Vector3<f64> {
    let theta = aim.theta.to_radians();
    let phi = aim.phi.to_radians();
    Vector3::new(
        theta.sin() * phi.sin(),
        theta.sin() * phi.cos(),
        -theta.cos(),
    )
}

/// Convert a unit direction vector to an aim in degrees
///
/// `phi` is returned in [0, 360). A vertical vector has no bearing and gets
/// `phi = 0`.
pub fn unit_vector_to_angular(vector: &Vector3<f64>) -> AimAngles {
    let phi = if vector.x.hypot(vector.y) < HORIZONTAL_EPS {
        0.0
    } else {
        vector.x.atan2(vector.y).to_degrees().rem_euclid(360.0)
    };
    // Rounding can push |z| slightly above 1
    let theta = (-vector.z).clamp(-1.0, 1.0).acos().to_degrees();
    AimAngles::new(theta, phi)
}

/// Body-frame aim that corresponds to a world-frame aim for the given attitude.
///
/// This is what keeps a fixed world direction fixed on screen while the
/// vehicle rotates.
///
/// When the result is vertical its bearing is taken from the requested
/// bearing rotated into the body frame, which is the limit of the bearing as
/// theta goes to 0.
pub fn compensate_for_attitude(aim: &AimAngles, roll: f64, yaw: f64, pitch: f64) -> AimAngles {
    let inverse = rotation_matrix(roll, yaw, pitch).transpose();
    let body = inverse * angular_to_unit_vector(aim);

    if body.x.hypot(body.y) >= HORIZONTAL_EPS {
        return unit_vector_to_angular(&body);
    }

    let theta = (-body.z).clamp(-1.0, 1.0).acos().to_degrees();
    let heading = inverse * angular_to_unit_vector(&AimAngles::new(90.0, aim.phi));
    let phi = if heading.x.hypot(heading.y) < HORIZONTAL_EPS {
        aim.phi.rem_euclid(360.0)
    } else {
        heading.x.atan2(heading.y).to_degrees().rem_euclid(360.0)
    };
    AimAngles::new(theta, phi)
}
