//! World-frame acceleration recovery and velocity integration.

use nalgebra::{Rotation3, Vector3};

/// Body-to-world rotation from filtered Euler angles (radians).
///
/// Intrinsic yaw → pitch → roll, i.e. `Rz(yaw) · Ry(pitch) · Rx(roll)`.
pub fn body_to_world(roll: f64, pitch: f64, yaw: f64) -> Rotation3<f64> {
    Rotation3::from_euler_angles(roll, pitch, yaw)
}

/// Rotate body acceleration into the world frame and remove gravity
/// from the vertical (z) component.
pub fn world_acceleration(
    accel_body: &Vector3<f64>,
    angles: (f64, f64, f64),
    gravity: f64,
) -> Vector3<f64> {
    let (roll, pitch, yaw) = angles;
    let mut accel_world = body_to_world(roll, pitch, yaw) * accel_body;
    accel_world.z -= gravity;
    accel_world
}

/// One low-pass + integration step.
///
/// Returns `(filtered acceleration, velocity)`. Without a previous
/// acceleration the raw value passes through; without a previous
/// velocity the velocity starts at zero.
pub fn integrate_step(
    accel_world: Vector3<f64>,
    accel_prev: Option<Vector3<f64>>,
    velocity_prev: Option<Vector3<f64>>,
    beta: f64,
    dt: f64,
) -> (Vector3<f64>, Vector3<f64>) {
    let accel_filtered = match accel_prev {
        Some(prev) => accel_world * beta + prev * (1.0 - beta),
        None => accel_world,
    };

    let velocity = match velocity_prev {
        Some(prev) => prev + accel_filtered * dt,
        None => Vector3::zeros(),
    };

    (accel_filtered, velocity)
}
