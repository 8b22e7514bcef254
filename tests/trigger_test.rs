//! Tests for expression detection and hold-frame triggering


use expression_keys::{
    config::Config,
    expression::ExpressionKey,
    frame_cycle::{FrameCycle, TickOutcome},
    ratios::ExpressionRatios,
    trigger::{detect_expressions, TriggerCounter},
};
use test_helpers::FaceBuilder;

fn states_for(face: FaceBuilder, config: &Config) -> expression_keys::trigger::ExpressionStates {
    let frame = face.build();
    detect_expressions(&ExpressionRatios::compute(Some(&frame)), config)
}

fn fired_per_frame(cycle: &mut FrameCycle, face: FaceBuilder, count: usize, config: &Config) -> Vec<Vec<ExpressionKey>> {
    let frame = face.build();
    (0..count)
        .map(|_| match cycle.tick(Some(&frame), config) {
            TickOutcome::Detecting { fired, .. } => fired,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect()
}

#[test]
fn test_sustained_expression_fires_once() {
    let config = Config::default();
    let mut cycle = FrameCycle::new();
    cycle.start_capture();

    let fired = fired_per_frame(&mut cycle, FaceBuilder::neutral().mouth_open(0.5), 8, &config);
    let fire_frames: Vec<usize> = fired
        .iter()
        .enumerate()
        .filter(|(_, keys)| keys.contains(&ExpressionKey::MouthOpen))
        .map(|(index, _)| index + 1)
        .collect();
    assert_eq!(fire_frames, [5]);

    // Dropping out re-arms the trigger
    fired_per_frame(&mut cycle, FaceBuilder::neutral(), 1, &config);
    assert_eq!(cycle.triggers().count(ExpressionKey::MouthOpen), 0);
    let fired = fired_per_frame(&mut cycle, FaceBuilder::neutral().mouth_open(0.5), 5, &config);
    assert_eq!(fired[4], [ExpressionKey::MouthOpen]);
}

#[test]
fn test_neutral_face_is_inactive_with_default_thresholds() {
    let states = states_for(FaceBuilder::neutral(), &Config::default());
    assert_eq!(states.len(), 5);
    assert!(states.values().all(|active| !active));
}

#[test]
fn test_wink_requires_other_eye_open() {
    let config = Config::default();

    let states = states_for(FaceBuilder::neutral().left_ear(0.1).right_ear(0.3), &config);
    assert!(states[&ExpressionKey::LeftWink]);
    assert!(!states[&ExpressionKey::RightWink]);

    // Both eyes closed is a blink
    let states = states_for(FaceBuilder::neutral().left_ear(0.1).right_ear(0.1), &config);
    assert!(!states[&ExpressionKey::LeftWink]);
    assert!(!states[&ExpressionKey::RightWink]);

    // Open eye above its threshold but inside the 1.1 margin
    let states = states_for(FaceBuilder::neutral().left_ear(0.1).right_ear(0.21), &config);
    assert!(!states[&ExpressionKey::LeftWink]);

    let states = states_for(FaceBuilder::neutral().right_ear(0.12).left_ear(0.25), &config);
    assert!(states[&ExpressionKey::RightWink]);
}

#[test]
fn test_disabled_gesture_is_inactive() {
    let mut config = Config::default();
    config.enabled_gestures.insert(ExpressionKey::Smile, false);
    let states = states_for(FaceBuilder::neutral().smile(0.9), &config);
    assert!(!states[&ExpressionKey::Smile]);
}

#[test]
fn test_missing_threshold_uses_default() {
    let mut config = Config::default();
    config.thresholds.clear();
    assert!(states_for(FaceBuilder::neutral().mouth_open(0.36), &config)[&ExpressionKey::MouthOpen]);
    assert!(!states_for(FaceBuilder::neutral().mouth_open(0.34), &config)[&ExpressionKey::MouthOpen]);
}

#[test]
fn test_threshold_is_strict() {
    let mut config = Config::default();
    config.thresholds.insert(ExpressionKey::EyebrowsRaised, 0.3);
    assert!(states_for(FaceBuilder::neutral().eyebrows_raised(0.31), &config)[&ExpressionKey::EyebrowsRaised]);
    assert!(!states_for(FaceBuilder::neutral().eyebrows_raised(0.29), &config)[&ExpressionKey::EyebrowsRaised]);
}

#[test]
fn test_hold_frames_come_from_config() {
    let mut config = Config::default();
    config.settings.hold_frames = 2;
    let mut counter = TriggerCounter::new();
    let states = states_for(FaceBuilder::neutral().smile(0.9), &config);

    assert!(counter.update_all(&states, &config).is_empty());
    assert_eq!(counter.update_all(&states, &config), [ExpressionKey::Smile]);
    assert!(counter.update_all(&states, &config).is_empty());
}

#[test]
fn test_disabling_mid_hold_resets_counter() {
    let config = Config::default();
    let mut cycle = FrameCycle::new();
    cycle.start_capture();
    fired_per_frame(&mut cycle, FaceBuilder::neutral().smile(0.9), 3, &config);
    assert_eq!(cycle.triggers().count(ExpressionKey::Smile), 3);

    cycle.set_gesture_enabled(ExpressionKey::Smile, false);
    assert_eq!(cycle.triggers().count(ExpressionKey::Smile), 0);
}
