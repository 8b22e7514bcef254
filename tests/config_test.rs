//! Tests for configuration files and the configuration store


use expression_keys::{
    action::Action,
    config::{Config, ConfigStore},
    expression::ExpressionKey,
};
use std::fs;
use test_helpers::temp_path;

#[test]
fn test_json_and_yaml_round_trip() {
    let mut config = Config::default();
    config.settings.hold_frames = 8;
    config.thresholds.insert(ExpressionKey::Smile, 0.4567);
    config
        .actions
        .insert(ExpressionKey::LeftWink, Action::hotkey("ctrl, alt, t"));

    for name in ["round_trip.json", "round_trip.yaml"] {
        let path = temp_path(name);
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config, "{name}");
    }
}

#[test]
fn test_json_file_uses_descriptor_format() {
    let path = temp_path("descriptor.json");
    Config::default().to_file(&path).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["actions"]["smile"]["type"], "write");
    assert_eq!(value["actions"]["smile"]["value"], ":)");
    assert_eq!(value["enabled_gestures"]["left_wink"], true);
    assert_eq!(value["settings"]["hold_frames"], 5);
}

#[test]
fn test_partial_file_merges_over_defaults() {
    let path = temp_path("partial.json");
    fs::write(
        &path,
        r#"{
            "thresholds": {"mouth_open": 0.99, "eyebrows_raised": 0.11},
            "actions": {"mouth_open": {"type": "hotkey", "value": "win,d"}}
        }"#,
    )
    .unwrap();
    let config = Config::load_or_default(&path);
    fs::remove_file(&path).unwrap();

    assert_eq!(config.threshold(ExpressionKey::MouthOpen), 0.99);
    assert_eq!(config.threshold(ExpressionKey::EyebrowsRaised), 0.11);
    assert_eq!(config.threshold(ExpressionKey::Smile), 0.35);
    assert_eq!(
        config.action(ExpressionKey::MouthOpen),
        Some(&Action::Hotkey(vec!["win".to_string(), "d".to_string()]))
    );
    assert_eq!(
        config.action(ExpressionKey::EyebrowsRaised),
        Some(&Action::Press("enter".to_string()))
    );
    assert_eq!(config.enabled_gestures, Config::default().enabled_gestures);
}

#[test]
fn test_malformed_or_missing_file_uses_defaults() {
    let path = temp_path("malformed.json");
    fs::write(&path, "{\n  \"thresholds\": {\n    \"mouth_open\": 0.3,\n  }\n}").unwrap();
    assert_eq!(Config::load_or_default(&path), Config::default());
    assert!(Config::from_file(&path).is_err());
    fs::remove_file(&path).unwrap();

    assert_eq!(
        Config::load_or_default(temp_path("does_not_exist.json")),
        Config::default()
    );
}

#[test]
fn test_invalid_values_use_defaults() {
    let path = temp_path("invalid.yaml");
    fs::write(&path, "settings:\n  hold_frames: 0\n").unwrap();
    let config = Config::load_or_default(&path);
    fs::remove_file(&path).unwrap();
    assert_eq!(config.settings.hold_frames, 5);
}

#[test]
fn test_store_persists_updates() {
    let path = temp_path("store.json");
    let mut store = ConfigStore::open(&path);
    assert!(!path.exists());

    store
        .update_thresholds(&[(ExpressionKey::MouthOpen, 0.88), (ExpressionKey::Smile, 0.77)].into())
        .unwrap();
    store
        .update_action(ExpressionKey::EyebrowsRaised, Action::hotkey("win,d"))
        .unwrap();
    store
        .update_gesture_enabled(ExpressionKey::RightWink, false)
        .unwrap();
    store.update_hold_frames(3).unwrap();

    let reloaded = ConfigStore::open(&path).snapshot();
    fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.threshold(ExpressionKey::MouthOpen), 0.88);
    assert_eq!(reloaded.threshold(ExpressionKey::Smile), 0.77);
    assert_eq!(reloaded.threshold(ExpressionKey::EyebrowsRaised), 0.28);
    assert_eq!(
        reloaded.action(ExpressionKey::EyebrowsRaised),
        Some(&Action::hotkey("win,d"))
    );
    assert!(!reloaded.is_enabled(ExpressionKey::RightWink));
    assert_eq!(reloaded.settings.hold_frames, 3);
}

#[test]
fn test_store_rejects_empty_action() {
    let mut store = ConfigStore::in_memory(Config::default());
    assert!(store
        .update_action(ExpressionKey::Smile, Action::Write(String::new()))
        .is_err());
    assert_eq!(
        store.snapshot().action(ExpressionKey::Smile),
        Some(&Action::Write(":)".to_string()))
    );
}

#[test]
fn test_unknown_keys_keep_the_rest_of_the_file() {
    let path = temp_path("unknown_keys.json");
    fs::write(
        &path,
        r#"{"settings": {"hold_frames": 9}, "thresholds": {"mouth_open": 0.5, "blink": 0.1}}"#,
    )
    .unwrap();

    let mut store = ConfigStore::open(&path);
    assert_eq!(store.snapshot().settings.hold_frames, 9);
    assert_eq!(store.snapshot().threshold(ExpressionKey::MouthOpen), 0.5);

    store
        .update_gesture_enabled(ExpressionKey::Smile, false)
        .unwrap();
    let reloaded = Config::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.settings.hold_frames, 9);
    assert_eq!(reloaded.threshold(ExpressionKey::MouthOpen), 0.5);
    assert!(!reloaded.is_enabled(ExpressionKey::Smile));
}

#[test]
fn test_null_threshold_keeps_default() {
    let path = temp_path("null_threshold.json");
    fs::write(&path, r#"{"thresholds": {"mouth_open": null, "smile": 0.4}}"#).unwrap();
    let config = Config::load_or_default(&path);
    fs::remove_file(&path).unwrap();

    assert_eq!(config.threshold(ExpressionKey::MouthOpen), 0.35);
    assert_eq!(config.threshold(ExpressionKey::Smile), 0.4);
}
