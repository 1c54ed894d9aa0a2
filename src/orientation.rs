//! Single-sample tilt/compass orientation.
//!
//! Roll and pitch come from the gravity direction, yaw from the
//! tilt-compensated magnetic field. The result is noisy and only ever
//! used as the Kalman filter's measurement.

use nalgebra::Vector3;

use crate::types::TiltVec;

/// Tilt/compass angles in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TiltCompass {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl TiltCompass {
    pub fn as_measurement(&self) -> TiltVec {
        TiltVec::new(self.roll, self.pitch, self.yaw)
    }
}

/// Estimate orientation from body-frame accel and mag.
pub fn tilt_compass(accel: &Vector3<f64>, mag: &Vector3<f64>) -> TiltCompass {
    let (ax, ay, az) = (accel.x, accel.y, accel.z);
    let (mx, my, mz) = (mag.x, mag.y, mag.z);

    let roll = ay.atan2((ax * ax + az * az).sqrt());
    let pitch = (-ax).atan2((ay * ay + az * az).sqrt());

    let (sin_r, cos_r) = roll.sin_cos();
    let (sin_p, cos_p) = pitch.sin_cos();
    let mx_c = mx * cos_p + mz * sin_p;
    let my_c = mx * sin_r * sin_p + my * cos_r - mz * sin_r * cos_p;

    let yaw = (-my_c).atan2(mx_c);

    TiltCompass { roll, pitch, yaw }
}
