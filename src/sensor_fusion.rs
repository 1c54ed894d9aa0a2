// sensor_fusion.rs: multi-channel orchestration for the joint tracker
//
// Everything in this module is independent of:
//   - file formats and the CLI
//   - how frames are delivered (live stream or recorded session)
//
// Raw frames go in; per-segment orientation/motion and joint angles come out.
// Segments are data keys into a map of channel filters, one filter per key.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::alignment::OrientationSeries;
use crate::channel::{ChannelFilter, ChannelOutput, ChannelStats};
use crate::config::FilterConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::filters::KalmanSnapshot;
use crate::joints::JointAngles;
use crate::sensors::{Axis, RawSample};
use crate::summary::JointSummary;
use crate::types::OrientationEstimate;

// ─── Channel identifiers ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Body segment carrying one sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    LeftThigh,
    LeftShin,
    RightThigh,
    RightShin,
    Torso,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::LeftThigh,
        Segment::LeftShin,
        Segment::RightThigh,
        Segment::RightShin,
        Segment::Torso,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::LeftThigh => "left_thigh",
            Segment::LeftShin => "left_shin",
            Segment::RightThigh => "right_thigh",
            Segment::RightShin => "right_shin",
            Segment::Torso => "torso",
        }
    }

    /// `None` for the torso.
    pub fn side(self) -> Option<Side> {
        match self {
            Segment::LeftThigh | Segment::LeftShin => Some(Side::Left),
            Segment::RightThigh | Segment::RightShin => Some(Side::Right),
            Segment::Torso => None,
        }
    }

    pub fn thigh(side: Side) -> Segment {
        match side {
            Side::Left => Segment::LeftThigh,
            Side::Right => Segment::RightThigh,
        }
    }

    pub fn shin(side: Side) -> Segment {
        match side {
            Side::Left => Segment::LeftShin,
            Side::Right => Segment::RightShin,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Input frame ─────────────────────────────────────────────────────────────

/// Whatever segments reported at one instant. Absent segments are simply
/// missing from the map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub timestamp: f64,
    #[serde(default)]
    pub segments: BTreeMap<Segment, RawSample>,
    /// Leg in use for single-leg exercises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leg_used: Option<Side>,
}

impl SensorFrame {
    pub fn new(timestamp: f64) -> Self {
        Self { timestamp, ..Self::default() }
    }

    pub fn with_segment(mut self, segment: Segment, sample: RawSample) -> Self {
        self.segments.insert(segment, sample);
        self
    }

    pub fn with_leg_used(mut self, side: Side) -> Self {
        self.leg_used = Some(side);
        self
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FusionEvent {
    ChannelStarted { segment: Segment },
    ChannelSkipped { segment: Segment, axis: Axis },
    NumericalFault { segment: Segment, determinant: f64 },
    ChannelFailed { segment: Segment, reason: String },
}

impl FusionEvent {
    fn from_channel_error(segment: Segment, error: TrackerError) -> Self {
        match error {
            TrackerError::MissingAxis { axis } => FusionEvent::ChannelSkipped { segment, axis },
            TrackerError::NumericalFault { determinant } => {
                FusionEvent::NumericalFault { segment, determinant }
            }
            other => FusionEvent::ChannelFailed { segment, reason: other.to_string() },
        }
    }
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub timestamp: f64,
    pub channels: BTreeMap<Segment, ChannelOutput>,
    pub joints: JointAngles,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<FusionEvent>,
}

impl FrameReport {
    pub fn orientation(&self, segment: Segment) -> Option<&OrientationEstimate> {
        self.channels.get(&segment).map(|c| &c.orientation)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FusionSnapshot {
    pub frames_processed: u64,
    pub channels: BTreeMap<Segment, KalmanSnapshot>,
    pub stats: BTreeMap<Segment, ChannelStats>,
}

fn joints_from<'a>(
    lookup: impl Fn(Segment) -> Option<&'a OrientationEstimate>,
    leg_used: Option<Side>,
) -> JointAngles {
    JointAngles::from_segments(
        lookup(Segment::LeftThigh),
        lookup(Segment::LeftShin),
        lookup(Segment::RightThigh),
        lookup(Segment::RightShin),
    )
    .mask_unused(leg_used)
}

// ─── Live fusion ─────────────────────────────────────────────────────────────

/// Frame-by-frame processing with one persistent filter per segment.
pub struct KinematicsFusion {
    config: FilterConfig,
    channels: BTreeMap<Segment, ChannelFilter>,
    frames_processed: u64,
}

impl KinematicsFusion {
    pub fn new(config: FilterConfig) -> TrackerResult<Self> {
        config.validate()?;
        Ok(Self { config, channels: BTreeMap::new(), frames_processed: 0 })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Process every segment present in `frame`.
    ///
    /// A segment that fails (missing axis, singular innovation) is left out
    /// of the report for this frame only; its filter keeps its state.
    pub fn process_frame(&mut self, frame: &SensorFrame) -> FrameReport {
        let mut channels = BTreeMap::new();
        let mut events = Vec::new();

        let config = &self.config;
        for (&segment, raw) in &frame.segments {
            let filter = self.channels.entry(segment).or_insert_with(|| {
                events.push(FusionEvent::ChannelStarted { segment });
                ChannelFilter::new(config.clone())
            });

            match filter.process(raw, frame.timestamp) {
                Ok(output) => {
                    channels.insert(segment, output);
                }
                Err(e) => {
                    warn!("[{segment}] sample at t={:.3}s skipped: {e}", frame.timestamp);
                    events.push(FusionEvent::from_channel_error(segment, e));
                }
            }
        }

        let joints = joints_from(
            |s| channels.get(&s).map(|c: &ChannelOutput| &c.orientation),
            frame.leg_used,
        );
        self.frames_processed += 1;
        debug!(
            "frame t={:.3}s: {} channels, knees L={:?} R={:?}",
            frame.timestamp,
            channels.len(),
            joints.left_knee,
            joints.right_knee
        );

        FrameReport { timestamp: frame.timestamp, channels, joints, events }
    }

    pub fn channel_stats(&self) -> BTreeMap<Segment, ChannelStats> {
        self.channels.iter().map(|(&s, f)| (s, f.stats().clone())).collect()
    }

    pub fn get_snapshot(&self) -> FusionSnapshot {
        FusionSnapshot {
            frames_processed: self.frames_processed,
            channels: self.channels.iter().map(|(&s, f)| (s, f.kalman().get_state())).collect(),
            stats: self.channel_stats(),
        }
    }
}

// ─── Batch processing ────────────────────────────────────────────────────────

/// Joint angles at one point of the output timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignedJoints {
    pub timestamp: f64,
    pub joints: JointAngles,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordingReport {
    pub timeline: Vec<AlignedJoints>,
    pub summary: JointSummary,
    pub stats: BTreeMap<Segment, ChannelStats>,
}

struct ChannelRun {
    segment: Segment,
    series: OrientationSeries,
    stats: ChannelStats,
}

fn run_channel(segment: Segment, samples: &[(f64, &RawSample)], config: &FilterConfig) -> ChannelRun {
    let mut filter = ChannelFilter::new(config.clone());
    let mut series = OrientationSeries::new();
    for &(timestamp, raw) in samples {
        match filter.process(raw, timestamp) {
            Ok(output) => series.push(output.orientation),
            Err(e) => warn!("[{segment}] sample at t={timestamp:.3}s skipped: {e}"),
        }
    }
    ChannelRun { segment, series, stats: filter.stats().clone() }
}

/// Process a whole recording.
///
/// Each segment's samples run through their own filter on a scoped thread.
/// Joint angles are then taken from the aligned orientation series, either
/// at every frame timestamp or, with `resample_interval`, on a uniform grid
/// spanning the time range covered by every segment present.
pub fn process_recording(
    frames: &[SensorFrame],
    config: &FilterConfig,
    resample_interval: Option<f64>,
) -> TrackerResult<RecordingReport> {
    config.validate()?;
    if let Some(interval) = resample_interval {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "resample interval must be a positive number of seconds, got {interval}"
            )));
        }
    }

    let mut per_segment: BTreeMap<Segment, Vec<(f64, &RawSample)>> = BTreeMap::new();
    for frame in frames {
        for (&segment, raw) in &frame.segments {
            per_segment.entry(segment).or_default().push((frame.timestamp, raw));
        }
    }

    let runs = crossbeam::scope(|scope| {
        let handles: Vec<_> = per_segment
            .iter()
            .map(|(&segment, samples)| {
                let handle = scope.spawn(move |_| run_channel(segment, samples, config));
                (segment, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(segment, handle)| {
                handle.join().map_err(|_| TrackerError::Worker(segment.to_string()))
            })
            .collect::<TrackerResult<Vec<ChannelRun>>>()
    })
    .map_err(|_| TrackerError::Worker("recording".to_string()))??;

    let mut series = BTreeMap::new();
    let mut stats = BTreeMap::new();
    for run in runs {
        info!(
            "[{}] {} samples processed, {} skipped, {} faults",
            run.segment, run.stats.processed, run.stats.missing_axis, run.stats.numerical_faults
        );
        series.insert(run.segment, run.series);
        stats.insert(run.segment, run.stats);
    }

    // Leg-in-use lookup by time
    let mut legs: Vec<(f64, Option<Side>)> = frames.iter().map(|f| (f.timestamp, f.leg_used)).collect();
    legs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let timeline: Vec<AlignedJoints> = match resample_interval {
        None => frames
            .iter()
            .map(|f| aligned_joints(&series, f.timestamp, f.leg_used))
            .collect(),
        Some(interval) => resample_grid(&series, interval)
            .into_iter()
            .map(|t| aligned_joints(&series, t, leg_used_at(&legs, t)))
            .collect(),
    };

    let summary = JointSummary::from_angles(timeline.iter().map(|a| &a.joints));
    info!("recording: {} frames in, {} timeline points out", frames.len(), timeline.len());

    Ok(RecordingReport { timeline, summary, stats })
}

fn aligned_joints(
    series: &BTreeMap<Segment, OrientationSeries>,
    timestamp: f64,
    leg_used: Option<Side>,
) -> AlignedJoints {
    let at: BTreeMap<Segment, OrientationEstimate> = series
        .iter()
        .filter_map(|(&s, os)| os.at(timestamp).map(|o| (s, o)))
        .collect();
    AlignedJoints { timestamp, joints: joints_from(|s| at.get(&s), leg_used) }
}

/// Uniform grid over the span shared by every non-empty series.
fn resample_grid(series: &BTreeMap<Segment, OrientationSeries>, interval: f64) -> Vec<f64> {
    let spans: Vec<(f64, f64)> = series.values().filter_map(|s| s.span()).collect();
    if spans.is_empty() {
        return Vec::new();
    }
    let start = spans.iter().map(|s| s.0).fold(f64::NEG_INFINITY, f64::max);
    let end = spans.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);

    let mut grid = Vec::new();
    let mut k = 0u64;
    loop {
        let t = start + k as f64 * interval;
        if t > end {
            break;
        }
        grid.push(t);
        k += 1;
    }
    grid
}

/// Leg in use of the latest frame at or before `t`.
fn leg_used_at(legs: &[(f64, Option<Side>)], t: f64) -> Option<Side> {
    let idx = legs.partition_point(|(ts, _)| *ts <= t);
    legs[..idx].last().and_then(|(_, side)| *side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn level() -> RawSample {
        RawSample::from_axes([0.0, 0.0, 9.81], [0.0, 0.0, 0.0], [0.3, 0.0, 0.5])
    }

    fn full_frame(t: f64) -> SensorFrame {
        Segment::ALL
            .into_iter()
            .fold(SensorFrame::new(t), |f, s| f.with_segment(s, level()))
    }

    #[test]
    fn test_segment_keys_and_sides() {
        assert_eq!(Segment::LeftShin.side(), Some(Side::Left));
        assert_eq!(Segment::Torso.side(), None);
        assert_eq!(Segment::thigh(Side::Right), Segment::RightThigh);
        assert_eq!(serde_json::to_string(&Segment::RightShin).unwrap(), "\"right_shin\"");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FilterConfig { dt: 0.0, ..FilterConfig::default() };
        assert!(matches!(KinematicsFusion::new(config), Err(TrackerError::InvalidConfig(_))));
    }

    #[test]
    fn test_frame_reports_every_segment() {
        let mut fusion = KinematicsFusion::new(FilterConfig::default()).unwrap();
        let report = fusion.process_frame(&full_frame(0.0));
        assert_eq!(report.channels.len(), 5);
        assert_eq!(
            report.events.iter().filter(|e| matches!(e, FusionEvent::ChannelStarted { .. })).count(),
            5
        );
        // Identical level segments: straight knees, upright hips
        assert_abs_diff_eq!(report.joints.left_knee.unwrap(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(report.joints.right_hip.unwrap(), 0.0, epsilon = 1e-6);

        let second = fusion.process_frame(&full_frame(0.2));
        assert!(second.events.is_empty());
        assert_eq!(fusion.get_snapshot().frames_processed, 2);
    }

    #[test]
    fn test_missing_axis_only_drops_that_channel() {
        let mut fusion = KinematicsFusion::new(FilterConfig::default()).unwrap();
        let mut frame = full_frame(0.0);
        frame.segments.insert(Segment::RightShin, level().without(Axis::Mz));

        let report = fusion.process_frame(&frame);
        assert!(report.channels.get(&Segment::RightShin).is_none());
        assert!(report.events.contains(&FusionEvent::ChannelSkipped {
            segment: Segment::RightShin,
            axis: Axis::Mz
        }));
        assert_eq!(report.joints.right_knee, None);
        assert!(report.joints.right_hip.is_some());
        assert!(report.joints.left_knee.is_some());

        let stats = fusion.channel_stats();
        assert_eq!(stats[&Segment::RightShin].missing_axis, 1);
        assert_eq!(stats[&Segment::LeftShin].processed, 1);
    }

    #[test]
    fn test_leg_used_masks_other_leg() {
        let mut fusion = KinematicsFusion::new(FilterConfig::default()).unwrap();
        let report = fusion.process_frame(&full_frame(0.0).with_leg_used(Side::Right));
        assert_eq!(report.joints.left_knee, None);
        assert_eq!(report.joints.left_hip, None);
        assert!(report.joints.right_knee.is_some());
    }

    #[test]
    fn test_recording_matches_live_at_frame_timestamps() {
        let frames: Vec<SensorFrame> = (0..20).map(|i| full_frame(i as f64 * 0.2)).collect();
        let report = process_recording(&frames, &FilterConfig::default(), None).unwrap();
        assert_eq!(report.timeline.len(), 20);

        let mut fusion = KinematicsFusion::new(FilterConfig::default()).unwrap();
        for (frame, aligned) in frames.iter().zip(&report.timeline) {
            let live = fusion.process_frame(frame);
            assert_eq!(aligned.timestamp, frame.timestamp);
            assert_abs_diff_eq!(
                aligned.joints.left_knee.unwrap(),
                live.joints.left_knee.unwrap(),
                epsilon = 1e-12
            );
        }
        assert_eq!(report.stats[&Segment::Torso].processed, 20);
        assert_eq!(report.summary.left_knee.count, 20);
    }

    #[test]
    fn test_resampled_grid_spans_common_range() {
        let mut frames: Vec<SensorFrame> = (0..11).map(|i| full_frame(i as f64 * 0.2)).collect();
        // Right shin only reports from t=0.4 on
        frames[0].segments.remove(&Segment::RightShin);
        frames[1].segments.remove(&Segment::RightShin);

        let report = process_recording(&frames, &FilterConfig::default(), Some(0.5)).unwrap();
        let times: Vec<f64> = report.timeline.iter().map(|a| a.timestamp).collect();
        assert_eq!(times.len(), 4);
        assert_abs_diff_eq!(times[0], 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(times[3], 1.9, epsilon = 1e-12);
        assert!(report.timeline.iter().all(|a| a.joints.right_knee.is_some()));
    }

    #[test]
    fn test_bad_resample_interval() {
        let frames = vec![full_frame(0.0)];
        assert!(process_recording(&frames, &FilterConfig::default(), Some(0.0)).is_err());
        assert!(process_recording(&frames, &FilterConfig::default(), Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_leg_used_lookup() {
        let legs = [(0.0, None), (1.0, Some(Side::Left)), (2.0, Some(Side::Right))];
        assert_eq!(leg_used_at(&legs, -1.0), None);
        assert_eq!(leg_used_at(&legs, 1.5), Some(Side::Left));
        assert_eq!(leg_used_at(&legs, 2.0), Some(Side::Right));
    }
}
