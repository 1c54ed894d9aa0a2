//! Drift-suppressing first-order high-pass on velocity.

use nalgebra::Vector3;

/// `v_hp = α · (v_hp_prev + v − v_prev)` once both a previous velocity and
/// a previous high-pass value exist; zero before that.
///
/// The result is the next call's `hp_prev`.
pub fn high_pass_velocity(
    velocity: Vector3<f64>,
    velocity_prev: Option<Vector3<f64>>,
    hp_prev: Option<Vector3<f64>>,
    alpha: f64,
) -> Vector3<f64> {
    match (velocity_prev, hp_prev) {
        (Some(v_prev), Some(hp)) => (hp + velocity - v_prev) * alpha,
        _ => Vector3::zeros(),
    }
}
