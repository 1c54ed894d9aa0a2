//! Linear algebra type system for the orientation filter
//!
//! Fixed-size nalgebra aliases so every matrix product in the
//! Kalman step is dimension-checked at compile time.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 6; // roll, pitch, yaw + 3 rate terms
pub const ANGLE_DIM: usize = 3;

// ===== Measurement Dimensions =====
pub const MEASURE_DIM_TILT: usize = 3; // roll, pitch, yaw from tilt/compass

// ===== Orientation Filter Types =====
pub type StateVec6 = SVector<f64, STATE_DIM>;
pub type StateMat6 = SMatrix<f64, STATE_DIM, STATE_DIM>;

// Control input (gyro rates) and its injection matrix
pub type ControlVec3 = SVector<f64, ANGLE_DIM>;
pub type ControlMat = SMatrix<f64, STATE_DIM, ANGLE_DIM>; // 6×3

// Measurement types
pub type TiltVec = SVector<f64, MEASURE_DIM_TILT>;
pub type TiltNoise = SMatrix<f64, MEASURE_DIM_TILT, MEASURE_DIM_TILT>;

// Kalman gain / observation
pub type KalmanGainTilt = SMatrix<f64, STATE_DIM, MEASURE_DIM_TILT>; // 6×3
pub type ObservationTilt = SMatrix<f64, MEASURE_DIM_TILT, STATE_DIM>; // 3×6
