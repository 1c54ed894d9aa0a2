//! Joint flexion angles from pairs of segment orientations.
//!
//! Segment rotations are built from (roll, pitch, yaw) in degrees as
//! roll about x, then pitch about y, then yaw about z, i.e.
//! `Rz(yaw) · Ry(pitch) · Rx(roll)`.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::sensor_fusion::Side;
use crate::types::OrientationEstimate;

pub fn segment_rotation(orientation: &OrientationEstimate) -> Rotation3<f64> {
    Rotation3::from_euler_angles(
        orientation.roll.to_radians(),
        orientation.pitch.to_radians(),
        orientation.yaw.to_radians(),
    )
}

/// Knee flexion [deg], `None` if either segment is unavailable.
///
/// Relative rotation `shin ∘ thigh⁻¹`, decomposed back into x-y-z angles;
/// the flexion is the magnitude of its pitch component.
pub fn knee_flexion(
    thigh: Option<&OrientationEstimate>,
    shin: Option<&OrientationEstimate>,
) -> Option<f64> {
    let thigh = segment_rotation(thigh?);
    let shin = segment_rotation(shin?);
    let relative = shin * thigh.inverse();
    let (_, pitch, _) = relative.euler_angles();
    Some(pitch.to_degrees().abs())
}

/// Hip flexion [deg] in [0, 90], `None` if the thigh is unavailable.
///
/// Angle between the thigh's local vertical axis and world vertical. The
/// absolute dot product folds flexion and hyperextension together.
pub fn hip_flexion(thigh: Option<&OrientationEstimate>) -> Option<f64> {
    let up = Vector3::z();
    let thigh_axis = segment_rotation(thigh?) * up;
    let dot = thigh_axis.dot(&up).clamp(-1.0, 1.0);
    Some(dot.abs().acos().to_degrees())
}

/// Knee and hip angles for both legs at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    pub left_knee: Option<f64>,
    pub right_knee: Option<f64>,
    pub left_hip: Option<f64>,
    pub right_hip: Option<f64>,
}

impl JointAngles {
    /// Derive all four angles from whichever segments are present.
    pub fn from_segments(
        left_thigh: Option<&OrientationEstimate>,
        left_shin: Option<&OrientationEstimate>,
        right_thigh: Option<&OrientationEstimate>,
        right_shin: Option<&OrientationEstimate>,
    ) -> Self {
        Self {
            left_knee: knee_flexion(left_thigh, left_shin),
            right_knee: knee_flexion(right_thigh, right_shin),
            left_hip: hip_flexion(left_thigh),
            right_hip: hip_flexion(right_thigh),
        }
    }

    /// Blank out the leg not in use for single-leg exercises.
    pub fn mask_unused(mut self, used: Option<Side>) -> Self {
        match used {
            Some(Side::Left) => {
                self.right_knee = None;
                self.right_hip = None;
            }
            Some(Side::Right) => {
                self.left_knee = None;
                self.left_hip = None;
            }
            None => {}
        }
        self
    }

    /// Round every available angle to one decimal place.
    pub fn rounded(self) -> Self {
        let round = |v: Option<f64>| v.map(|a| (a * 10.0).round() / 10.0);
        Self {
            left_knee: round(self.left_knee),
            right_knee: round(self.right_knee),
            left_hip: round(self.left_hip),
            right_hip: round(self.right_hip),
        }
    }

    pub fn knee(&self, side: Side) -> Option<f64> {
        match side {
            Side::Left => self.left_knee,
            Side::Right => self.right_knee,
        }
    }

    pub fn hip(&self, side: Side) -> Option<f64> {
        match side {
            Side::Left => self.left_hip,
            Side::Right => self.right_hip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn orient(roll: f64, pitch: f64, yaw: f64) -> OrientationEstimate {
        OrientationEstimate::new(0.0, roll, pitch, yaw)
    }

    #[test]
    fn test_knee_thirty_degrees() {
        let knee = knee_flexion(Some(&orient(0.0, 30.0, 0.0)), Some(&orient(0.0, 0.0, 0.0)));
        assert_abs_diff_eq!(knee.unwrap(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_knee_straight_leg_is_zero() {
        let o = orient(12.0, -20.0, 75.0);
        let knee = knee_flexion(Some(&o), Some(&o)).unwrap();
        assert_abs_diff_eq!(knee, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_knee_depends_only_on_relative_pitch() {
        let a = knee_flexion(Some(&orient(0.0, 10.0, 0.0)), Some(&orient(0.0, 55.0, 0.0))).unwrap();
        let b = knee_flexion(Some(&orient(0.0, -10.0, 0.0)), Some(&orient(0.0, -55.0, 0.0))).unwrap();
        assert_abs_diff_eq!(a, 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }

    #[test]
    fn test_knee_unavailable_without_both_segments() {
        let o = orient(0.0, 10.0, 0.0);
        assert_eq!(knee_flexion(None, Some(&o)), None);
        assert_eq!(knee_flexion(Some(&o), None), None);
    }

    #[test]
    fn test_hip_upright_is_zero() {
        let hip = hip_flexion(Some(&orient(0.0, 0.0, 0.0))).unwrap();
        assert_abs_diff_eq!(hip, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hip_folds_sign() {
        let fwd = hip_flexion(Some(&orient(0.0, 40.0, 0.0))).unwrap();
        let back = hip_flexion(Some(&orient(0.0, -40.0, 0.0))).unwrap();
        assert_abs_diff_eq!(fwd, 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fwd, back, epsilon = 1e-9);
        // Past horizontal folds back toward zero
        let over = hip_flexion(Some(&orient(120.0, 0.0, 0.0))).unwrap();
        assert_abs_diff_eq!(over, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hip_always_within_quarter_turn() {
        let mut angle = -180.0;
        while angle <= 180.0 {
            for (r, p, y) in [(angle, 0.0, 0.0), (0.0, angle, angle), (angle, angle * 0.5, -angle)] {
                let hip = hip_flexion(Some(&orient(r, p, y))).unwrap();
                assert!(hip >= 0.0 && hip <= 90.0 + 1e-9, "hip {hip} out of range for {r},{p},{y}");
            }
            angle += 7.5;
        }
    }

    #[test]
    fn test_mask_and_round() {
        let angles = JointAngles {
            left_knee: Some(12.345),
            right_knee: Some(20.06),
            left_hip: Some(5.0),
            right_hip: Some(7.0),
        };
        let masked = angles.mask_unused(Some(Side::Left)).rounded();
        assert_eq!(masked.left_knee, Some(12.3));
        assert_eq!(masked.right_knee, None);
        assert_eq!(masked.right_hip, None);
        assert_eq!(masked.hip(Side::Left), Some(5.0));
        assert_eq!(angles.mask_unused(None), angles);
    }
}
