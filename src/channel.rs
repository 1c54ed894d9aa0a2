//! Per-channel filter state and the single-sample pipeline.
//!
//! One `ChannelFilter` exists per body segment. It owns the Kalman state and
//! the previous acceleration / velocity / high-pass velocity, and every call
//! for that segment threads through it. Nothing is reset between calls.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::filters::{high_pass_velocity, integrate_step, world_acceleration, OrientationKalman};
use crate::orientation::tilt_compass;
use crate::sensors::{normalize, RawSample};
use crate::types::{MotionEstimate, OrientationEstimate};

/// Everything the pipeline produces for one channel at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelOutput {
    pub orientation: OrientationEstimate,
    pub motion: MotionEstimate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub processed: u64,
    pub missing_axis: u64,
    pub numerical_faults: u64,
}

#[derive(Clone, Debug)]
pub struct ChannelFilter {
    config: FilterConfig,
    kalman: OrientationKalman,
    accel_prev: Option<Vector3<f64>>,
    velocity_prev: Option<Vector3<f64>>,
    velocity_hp_prev: Option<Vector3<f64>>,
    stats: ChannelStats,
}

impl ChannelFilter {
    pub fn new(config: FilterConfig) -> Self {
        let kalman = OrientationKalman::new(&config);
        Self {
            config,
            kalman,
            accel_prev: None,
            velocity_prev: None,
            velocity_hp_prev: None,
            stats: ChannelStats::default(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn kalman(&self) -> &OrientationKalman {
        &self.kalman
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Normalize and process one raw sample.
    pub fn process(&mut self, raw: &RawSample, timestamp: f64) -> TrackerResult<ChannelOutput> {
        let canonical = normalize(raw).map_err(|e| {
            self.stats.missing_axis += 1;
            e
        })?;
        let imu = canonical.vectors();

        // Tilt/compass measurement -> Kalman
        let measurement = tilt_compass(&imu.accel, &imu.mag).as_measurement();
        let angles = match self.kalman.step(&measurement, &imu.gyro) {
            Ok(angles) => angles,
            Err(e) => {
                if matches!(e, TrackerError::NumericalFault { .. }) {
                    self.stats.numerical_faults += 1;
                }
                return Err(e);
            }
        };
        let (roll, pitch, yaw) = (angles[0], angles[1], angles[2]);

        // World-frame accel -> low-pass -> velocity -> high-pass
        let accel_world = world_acceleration(&imu.accel, (roll, pitch, yaw), self.config.gravity);
        let (accel_filtered, velocity) = integrate_step(
            accel_world,
            self.accel_prev,
            self.velocity_prev,
            self.config.beta,
            self.config.dt,
        );
        let velocity_hp = high_pass_velocity(
            velocity,
            self.velocity_prev,
            self.velocity_hp_prev,
            self.config.alpha,
        );

        self.accel_prev = Some(accel_filtered);
        self.velocity_prev = Some(velocity);
        self.velocity_hp_prev = Some(velocity_hp);
        self.stats.processed += 1;

        Ok(ChannelOutput {
            orientation: OrientationEstimate::new(
                timestamp,
                roll.to_degrees(),
                pitch.to_degrees(),
                yaw.to_degrees(),
            ),
            motion: MotionEstimate {
                acceleration: accel_filtered,
                velocity,
                velocity_highpass: velocity_hp,
            },
        })
    }
}
