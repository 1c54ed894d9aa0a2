//! Lower-limb joint tracking from body-worn 9-axis IMUs.
//!
//! Each segment's samples pass through a persistent per-channel filter
//! (tilt/compass measurement, orientation Kalman filter, world-frame motion
//! with low-pass, integration and high-pass stages). Knee and hip flexion
//! are derived from pairs of segment orientations, aligned in time where
//! channels sample asynchronously.

pub mod alignment;
pub mod channel;
pub mod config;
pub mod error;
pub mod filters;
pub mod joints;
pub mod orientation;
pub mod sensor_fusion;
pub mod sensors;
pub mod summary;
pub mod types;

pub use alignment::{interpolate_orientation, OrientationSeries};
pub use channel::{ChannelFilter, ChannelOutput, ChannelStats};
pub use config::FilterConfig;
pub use error::{TrackerError, TrackerResult};
pub use joints::{hip_flexion, knee_flexion, JointAngles};
pub use orientation::{tilt_compass, TiltCompass};
pub use sensor_fusion::{
    process_recording, AlignedJoints, FrameReport, FusionEvent, FusionSnapshot, KinematicsFusion,
    RecordingReport, Segment, SensorFrame, Side,
};
pub use sensors::{normalize, parse_imu_string, parse_timestamp, Axis, CanonicalSample, RawSample};
pub use summary::{AngleSummary, JointSummary};
pub use types::{MotionEstimate, OrientationEstimate};
