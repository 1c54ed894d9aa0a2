use thiserror::Error;

use crate::sensors::Axis;

/// Joint tracker error types
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Missing axis {axis} in raw sample")]
    MissingAxis { axis: Axis },

    #[error("Innovation covariance is singular or near-singular (det = {determinant:e})")]
    NumericalFault { determinant: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Channel worker for {0} panicked")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// Faults that only affect one channel for one instant.
    pub fn is_channel_local(&self) -> bool {
        matches!(
            self,
            TrackerError::MissingAxis { .. } | TrackerError::NumericalFault { .. }
        )
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
