//! Temporal alignment of asynchronously sampled channels.
//!
//! Each channel's orientation series is linearly interpolated to a common
//! query timestamp. No extrapolation: queries outside a series' time span
//! are unavailable.

use serde::{Deserialize, Serialize};

use crate::types::OrientationEstimate;

/// One channel's orientation estimates, kept sorted by timestamp.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationSeries {
    samples: Vec<OrientationEstimate>,
}

impl OrientationSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from samples in any order.
    pub fn from_unsorted(mut samples: Vec<OrientationEstimate>) -> Self {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { samples }
    }

    /// Insert keeping timestamp order. Equal timestamps keep arrival order.
    pub fn push(&mut self, sample: OrientationEstimate) {
        let idx = self.samples.partition_point(|s| s.timestamp <= sample.timestamp);
        self.samples.insert(idx, sample);
    }

    pub fn as_slice(&self) -> &[OrientationEstimate] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// (first, last) timestamps
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.timestamp, self.samples.last()?.timestamp))
    }

    pub fn at(&self, target: f64) -> Option<OrientationEstimate> {
        interpolate_orientation(&self.samples, target)
    }
}

/// Interpolate a timestamp-sorted series at `target`.
///
/// Returns `None` for an empty series or a target outside [first, last].
/// Equal bracketing timestamps return the earlier sample unchanged.
pub fn interpolate_orientation(
    series: &[OrientationEstimate],
    target: f64,
) -> Option<OrientationEstimate> {
    let first = series.first()?;
    let last = series.last()?;
    if target < first.timestamp || target > last.timestamp {
        return None;
    }

    // First index with timestamp >= target
    let idx = series.partition_point(|s| s.timestamp < target);
    if idx == 0 {
        return Some(*first);
    }
    if idx >= series.len() {
        return Some(*last);
    }

    let before = &series[idx - 1];
    let after = &series[idx];
    let (t1, t2) = (before.timestamp, after.timestamp);
    if t2 == t1 {
        return Some(*before);
    }

    let frac = (target - t1) / (t2 - t1);
    let lerp = |v1: f64, v2: f64| v1 + frac * (v2 - v1);
    Some(OrientationEstimate {
        timestamp: target,
        roll: lerp(before.roll, after.roll),
        pitch: lerp(before.pitch, after.pitch),
        yaw: lerp(before.yaw, after.yaw),
    })
}
