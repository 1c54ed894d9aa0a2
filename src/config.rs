use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{TrackerError, TrackerResult};

/// Per-session filter configuration.
///
/// One value is shared by every channel of a session; `dt` is the nominal
/// sample interval and is never measured from timestamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Nominal sample interval [s]
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Velocity high-pass coefficient
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// World acceleration low-pass coefficient
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Diagonal process noise per state
    #[serde(default = "default_process_noise")]
    pub process_noise: f64,
    /// Diagonal measurement noise per tilt/compass axis
    #[serde(default = "default_measurement_noise")]
    pub measurement_noise: f64,
    /// Removed from the world vertical axis [m/s²]
    #[serde(default = "default_gravity")]
    pub gravity: f64,
}

fn default_dt() -> f64 { 0.2 }
fn default_alpha() -> f64 { 0.95 }
fn default_beta() -> f64 { 0.1 }
fn default_process_noise() -> f64 { 0.01 }
fn default_measurement_noise() -> f64 { 0.1 }
fn default_gravity() -> f64 { 9.81 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            alpha: default_alpha(),
            beta: default_beta(),
            process_noise: default_process_noise(),
            measurement_noise: default_measurement_noise(),
            gravity: default_gravity(),
        }
    }
}

impl FilterConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: FilterConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "dt must be a positive number of seconds, got {}",
                self.dt
            )));
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !self.gravity.is_finite() {
            return Err(TrackerError::InvalidConfig("gravity must be finite".to_string()));
        }
        Ok(())
    }
}
