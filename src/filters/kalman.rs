/// 6-State Linear Orientation Kalman Filter
///
/// State Vector (6D):
/// [0-2]: Roll, pitch, yaw (radians)
/// [3-5]: Rate terms driven by the gyro control input (radians/s)
///
/// Predict:  x' = A·x + B·u,  P' = A·P·Aᵀ + Q
/// Update:   the tilt/compass angles observe [0-2] directly.
///
/// A couples each angle to its rate term by dt; B injects the gyro into
/// the rate terms only, scaled by dt.
use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::types::{
    ControlMat, ControlVec3, KalmanGainTilt, ObservationTilt, StateMat6, StateVec6, TiltNoise, TiltVec,
    ANGLE_DIM,
};

/// |det(S)| below this is treated as singular.
const SINGULAR_DET_EPS: f64 = 1e-12;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KalmanSnapshot {
    /// Filtered (roll, pitch, yaw) [rad]
    pub angles: (f64, f64, f64),

    /// Rate terms [rad/s]
    pub rates: (f64, f64, f64),

    /// Covariance trace for uncertainty
    pub covariance_trace: f64,

    pub updates: u64,
}

#[derive(Clone, Debug)]
pub struct OrientationKalman {
    /// Time step [seconds]
    dt: f64,

    /// State vector [6D]
    state: StateVec6,

    /// Covariance matrix [6x6]
    covariance: StateMat6,

    /// Process noise matrix [6x6]
    process_noise: StateMat6,

    /// Measurement noise [3x3]
    measurement_noise: TiltNoise,

    transition: StateMat6,
    control: ControlMat,
    observation: ObservationTilt,

    updates: u64,
}

impl OrientationKalman {
    /// Zero state, identity covariance.
    pub fn new(config: &FilterConfig) -> Self {
        Self::from_parts(config, StateVec6::zeros(), StateMat6::identity())
    }

    /// Resume from an existing state and covariance.
    pub fn from_parts(config: &FilterConfig, state: StateVec6, covariance: StateMat6) -> Self {
        let dt = config.dt;

        let mut transition = StateMat6::identity();
        let mut control = ControlMat::zeros();
        let mut observation = ObservationTilt::zeros();
        for i in 0..ANGLE_DIM {
            transition[(i, i + ANGLE_DIM)] = dt;
            control[(i + ANGLE_DIM, i)] = dt;
            observation[(i, i)] = 1.0;
        }

        Self {
            dt,
            state,
            covariance,
            process_noise: StateMat6::identity() * config.process_noise,
            measurement_noise: TiltNoise::identity() * config.measurement_noise,
            transition,
            control,
            observation,
            updates: 0,
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn state(&self) -> &StateVec6 {
        &self.state
    }

    pub fn covariance(&self) -> &StateMat6 {
        &self.covariance
    }

    /// Filtered (roll, pitch, yaw) in radians.
    pub fn angles(&self) -> TiltVec {
        self.state.fixed_rows::<ANGLE_DIM>(0).into_owned()
    }

    /// Run one predict + update cycle.
    ///
    /// `measurement` is the tilt/compass (roll, pitch, yaw) and `gyro` the body
    /// rates in rad/s. On a numerical fault the filter is left untouched.
    pub fn step(&mut self, measurement: &TiltVec, gyro: &ControlVec3) -> TrackerResult<TiltVec> {
        let (x_pred, p_pred) = self.predicted(gyro);
        let (x_new, p_new) = self.corrected(&x_pred, &p_pred, measurement)?;

        self.state = x_new;
        self.covariance = p_new;
        self.updates += 1;

        Ok(self.angles())
    }

    fn predicted(&self, gyro: &ControlVec3) -> (StateVec6, StateMat6) {
        let a = &self.transition;
        let x_pred = a * self.state + self.control * gyro;
        let p_pred = a * self.covariance * a.transpose() + self.process_noise;
        (x_pred, p_pred)
    }

    fn corrected(
        &self,
        x_pred: &StateVec6,
        p_pred: &StateMat6,
        measurement: &TiltVec,
    ) -> TrackerResult<(StateVec6, StateMat6)> {
        let h = &self.observation;
        let h_t = h.transpose();

        // Innovation covariance: S = H * P * H^T + R
        let s = h * p_pred * h_t + self.measurement_noise;
        let determinant = s.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_DET_EPS {
            return Err(TrackerError::NumericalFault { determinant });
        }
        let s_inv = s
            .try_inverse()
            .ok_or(TrackerError::NumericalFault { determinant })?;

        // Kalman gain: K = P * H^T * S^-1
        let k: KalmanGainTilt = p_pred * h_t * s_inv;

        let innovation = measurement - h * x_pred;
        let x_new = x_pred + k * innovation;

        // Joseph form keeps P symmetric PSD
        let i_kh = StateMat6::identity() - k * h;
        let p_new = i_kh * p_pred * i_kh.transpose() + k * self.measurement_noise * k.transpose();

        Ok((x_new, p_new))
    }

    pub fn get_state(&self) -> KalmanSnapshot {
        KalmanSnapshot {
            angles: (self.state[0], self.state[1], self.state[2]),
            rates: (self.state[3], self.state[4], self.state[5]),
            covariance_trace: self.covariance.trace(),
            updates: self.updates,
        }
    }
}
