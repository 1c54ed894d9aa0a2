pub mod linalg;

pub use linalg::*;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Filtered segment orientation, degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationEstimate {
    pub timestamp: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl OrientationEstimate {
    pub fn new(timestamp: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { timestamp, roll, pitch, yaw }
    }

    /// (roll, pitch, yaw) in degrees
    pub fn angles(&self) -> (f64, f64, f64) {
        (self.roll, self.pitch, self.yaw)
    }
}

/// World-frame motion for one sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionEstimate {
    /// Low-pass filtered world acceleration, gravity removed
    pub acceleration: Vector3<f64>,
    /// Integrated world velocity
    pub velocity: Vector3<f64>,
    /// Velocity after the drift-suppressing high-pass
    pub velocity_highpass: Vector3<f64>,
}

impl Default for MotionEstimate {
    fn default() -> Self {
        Self {
            acceleration: Vector3::zeros(),
            velocity: Vector3::zeros(),
            velocity_highpass: Vector3::zeros(),
        }
    }
}
