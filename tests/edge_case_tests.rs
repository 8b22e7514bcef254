//! Edge case tests for ratios, calibration, triggering and replay


use expression_keys::{
    action::LogInjector,
    app::{AppOptions, ExpressionApp},
    calibrator::{CalibrationSettings, Calibrator},
    config::{Config, ConfigStore},
    expression::ExpressionKey,
    landmark_source::ReplaySource,
    landmarks::{Landmark, LandmarkFrame},
    ratios::ExpressionRatios,
    trigger::{detect_expressions, TriggerCounter},
    Error,
};
use proptest::prelude::*;
use std::io::Cursor;
use test_helpers::{recording, FaceBuilder};

#[test]
fn test_single_frame_phases() {
    let mut calibrator = Calibrator::default();
    let settings = CalibrationSettings {
        frames_to_collect: 1,
        ..CalibrationSettings::default()
    };
    calibrator.start([ExpressionKey::EyebrowsRaised], settings).unwrap();
    calibrator.process_landmarks(Some(&FaceBuilder::neutral().build()));
    calibrator.process_landmarks(Some(&FaceBuilder::neutral().eyebrows_raised(0.4).build()));

    let thresholds = calibrator.calculated_thresholds().unwrap();
    assert!((thresholds[&ExpressionKey::EyebrowsRaised] - 0.32).abs() < 1e-9);
}

#[test]
fn test_hold_of_one_fires_immediately() {
    let mut counter = TriggerCounter::new();
    assert!(counter.update(ExpressionKey::LeftWink, true, true, 1));
    assert!(!counter.update(ExpressionKey::LeftWink, true, true, 1));
}

#[test]
fn test_nan_landmarks_never_activate() {
    let frame = LandmarkFrame::new(vec![Landmark::new(f64::NAN, f64::NAN); 478]);
    let states = detect_expressions(&ExpressionRatios::compute(Some(&frame)), &Config::default());
    assert!(states.values().all(|active| !active));
}

#[test]
fn test_empty_recording() {
    let source = ReplaySource::from_reader(Cursor::new(Vec::new()));
    let store = ConfigStore::in_memory(Config::default());
    let mut app = ExpressionApp::new(store, source, LogInjector::new(), AppOptions::default());
    let summary = app.run().unwrap();
    assert_eq!(summary.frames, 0);
    assert_eq!(summary.total_fired(), 0);
}

#[test]
fn test_malformed_recording_stops_the_run() {
    let mut data = recording(&[Some(FaceBuilder::neutral().build())]);
    data.extend_from_slice(b"{\"not\": \"a frame\"}\n");
    let source = ReplaySource::from_reader(Cursor::new(data));
    let store = ConfigStore::in_memory(Config::default());
    let mut app = ExpressionApp::new(store, source, LogInjector::new(), AppOptions::default());

    assert!(matches!(app.run(), Err(Error::Replay(_))));
}

#[test]
fn test_calibration_without_enabled_gestures_is_rejected() {
    let mut config = Config::default();
    for key in ExpressionKey::ALL {
        config.enabled_gestures.insert(key, false);
    }
    let source = ReplaySource::from_reader(Cursor::new(Vec::new()));
    let options = AppOptions {
        calibrate: true,
        realtime: false,
    };
    let mut app = ExpressionApp::new(ConfigStore::in_memory(config), source, LogInjector::new(), options);
    assert!(matches!(app.run(), Err(Error::Capture(_))));
}

proptest! {
    #[test]
    fn prop_fires_exactly_once_per_activation(hold in 1u32..20, active_frames in 0u32..40) {
        let mut counter = TriggerCounter::new();
        let fires = (0..active_frames)
            .filter(|_| counter.update(ExpressionKey::Smile, true, true, hold))
            .count();
        prop_assert_eq!(fires, usize::from(active_frames >= hold));
    }

    #[test]
    fn prop_wink_never_fires_on_blink(left in 0.0..0.2f64, right in 0.0..0.21f64) {
        let frame = FaceBuilder::neutral().left_ear(left).right_ear(right).build();
        let states = detect_expressions(&ExpressionRatios::compute(Some(&frame)), &Config::default());
        prop_assert!(!states[&ExpressionKey::LeftWink]);
    }
}
