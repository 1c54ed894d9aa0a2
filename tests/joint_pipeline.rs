use approx::assert_abs_diff_eq;
use joint_tracker_rs::{
    hip_flexion, interpolate_orientation, knee_flexion, normalize, parse_imu_string,
    process_recording, Axis, FilterConfig, KinematicsFusion, OrientationEstimate, RawSample,
    Segment, SensorFrame, Side, TrackerError,
};

fn orient(roll: f64, pitch: f64, yaw: f64) -> OrientationEstimate {
    OrientationEstimate::new(0.0, roll, pitch, yaw)
}

fn level_sample() -> RawSample {
    RawSample::from_axes([0.0, 0.0, 9.81], [0.0, 0.0, 0.0], [0.3, 0.0, 0.5])
}

#[test]
fn test_knee_from_thigh_and_shin() {
    let knee = knee_flexion(Some(&orient(0.0, 30.0, 0.0)), Some(&orient(0.0, 0.0, 0.0))).unwrap();
    assert_abs_diff_eq!(knee, 30.0, epsilon = 1e-6);
}

#[test]
fn test_upright_thigh_has_no_hip_flexion() {
    let hip = hip_flexion(Some(&orient(0.0, 0.0, 0.0))).unwrap();
    assert_abs_diff_eq!(hip, 0.0, epsilon = 1e-9);
}

#[test]
fn test_absent_limb_is_unavailable_other_limb_computes() {
    let mut fusion = KinematicsFusion::new(FilterConfig::default()).unwrap();
    let mut last = None;
    for i in 0..10 {
        let frame = SensorFrame::new(i as f64 * 0.2)
            .with_segment(Segment::RightThigh, level_sample())
            .with_segment(Segment::RightShin, level_sample());
        last = Some(fusion.process_frame(&frame));
    }
    let joints = last.unwrap().joints;
    assert_eq!(joints.left_knee, None);
    assert_eq!(joints.left_hip, None);
    assert_abs_diff_eq!(joints.right_knee.unwrap(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(joints.right_hip.unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_absent_limb_in_batch_recording() {
    let frames: Vec<SensorFrame> = (0..10)
        .map(|i| {
            SensorFrame::new(i as f64 * 0.2)
                .with_segment(Segment::LeftThigh, level_sample())
                .with_segment(Segment::LeftShin, level_sample())
        })
        .collect();
    let report = process_recording(&frames, &FilterConfig::default(), None).unwrap();
    assert_eq!(report.timeline.len(), 10);
    for point in &report.timeline {
        assert!(point.joints.left_knee.is_some());
        assert!(point.joints.left_hip.is_some());
        assert_eq!(point.joints.knee(Side::Right), None);
        assert_eq!(point.joints.hip(Side::Right), None);
    }
    assert_eq!(report.summary.right_knee.count, 0);
    assert_eq!(report.summary.left_knee.count, 10);
}

#[test]
fn test_line_protocol_into_normalizer() {
    let raw = parse_imu_string("AX:0.10AY:-0.20AZ:9.80GX:0.00GY:0.00GZ:180.00MX:0.30MY:0.00MZ:0.50Battery: 85%");
    assert_eq!(raw.battery_percent, Some(85));
    let canonical = normalize(&raw).unwrap();
    assert_abs_diff_eq!(canonical.0[0], 9.80, epsilon = 1e-12);
    assert_abs_diff_eq!(canonical.0[3], std::f64::consts::PI, epsilon = 1e-12);

    let partial = parse_imu_string("AX:0.10AY:-0.20AZ:9.80");
    assert!(matches!(normalize(&partial), Err(TrackerError::MissingAxis { axis: Axis::Gz })));
}

#[test]
fn test_recording_json_shape() {
    let json = r#"[
        {"timestamp": 0.0, "segments": {
            "left_thigh": {"AX": 0, "AY": 0, "AZ": 9.81, "GX": 0, "GY": 0, "GZ": 0, "MX": 0.3, "MY": 0, "MZ": 0.5, "Battery": 90},
            "left_shin":  {"AX": 0, "AY": 0, "AZ": 9.81, "GX": 0, "GY": 0, "GZ": 0, "MX": 0.3, "MY": 0, "MZ": 0.5}
        }, "leg_used": "left"},
        {"timestamp": 0.2, "segments": {
            "left_thigh": {"AX": 0, "AY": 0, "AZ": 9.81, "GX": 0, "GY": 0, "GZ": 0, "MX": 0.3, "MY": 0, "MZ": 0.5},
            "left_shin":  {"AX": 0, "AY": 0, "AZ": 9.81, "GX": 0, "GY": 0, "GZ": 0, "MX": 0.3, "MY": 0, "MZ": 0.5}
        }, "leg_used": "left"}
    ]"#;
    let frames: Vec<SensorFrame> = serde_json::from_str(json).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].leg_used, Some(Side::Left));
    assert_eq!(frames[0].segments[&Segment::LeftThigh].battery_percent, Some(90));
    assert_eq!(frames[0].segments[&Segment::LeftThigh].get(Axis::Az), Some(9.81));

    let report = process_recording(&frames, &FilterConfig::default(), None).unwrap();
    let out = serde_json::to_value(&report).unwrap();
    assert!(out["stats"]["left_thigh"]["processed"].as_u64() == Some(2));
}

#[test]
fn test_aligner_boundaries() {
    let series = [
        OrientationEstimate::new(1.0, 0.0, 10.0, 0.0),
        OrientationEstimate::new(2.0, 0.0, 20.0, 0.0),
    ];
    assert_eq!(interpolate_orientation(&series, 0.5), None);
    assert_eq!(interpolate_orientation(&series, 2.5), None);
    assert_eq!(interpolate_orientation(&[], 1.0), None);
    assert_abs_diff_eq!(interpolate_orientation(&series, 1.5).unwrap().pitch, 15.0, epsilon = 1e-12);
}
