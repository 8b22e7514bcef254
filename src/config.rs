//! Configuration management for the expression input application
//!
//! The configuration has four sections: runtime `settings`, per-expression
//! `thresholds`, the `actions` bound to expressions and the
//! `enabled_gestures` switches. Files are YAML when the extension says so and
//! JSON otherwise.

use crate::{
    action::Action,
    calibrator::CalibrationSettings,
    constants::{
        DEFAULT_FRAMES_TO_COLLECT, DEFAULT_HOLD_FRAMES, DEFAULT_THRESHOLD_FACTOR,
        DEFAULT_TICK_INTERVAL_MS, DEFAULT_WINK_THRESHOLD_FACTOR,
    },
    expression::{ExpressionKey, ThresholdSet},
    Error, Result,
};
use log::{info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runtime settings
    pub settings: Settings,

    /// Decision threshold per expression
    pub thresholds: ThresholdSet,

    /// Action fired by each expression
    pub actions: BTreeMap<ExpressionKey, Action>,

    /// Which expressions are monitored
    pub enabled_gestures: BTreeMap<ExpressionKey, bool>,
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Consecutive active frames before an expression fires
    pub hold_frames: u32,

    /// Valid frames each calibration phase collects
    pub frames_to_collect: usize,

    /// Position of a threshold between neutral and active means (0-1]
    pub threshold_factor: f64,

    /// Fraction of the neutral eye aspect ratio that counts as closed (0-1)
    pub wink_threshold_factor: f64,

    /// Tick period when pacing in real time
    pub tick_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hold_frames: DEFAULT_HOLD_FRAMES,
            frames_to_collect: DEFAULT_FRAMES_TO_COLLECT,
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            wink_threshold_factor: DEFAULT_WINK_THRESHOLD_FACTOR,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let thresholds = ExpressionKey::ALL
            .into_iter()
            .map(|key| (key, key.default_threshold()))
            .collect();
        let enabled_gestures = ExpressionKey::ALL.into_iter().map(|key| (key, true)).collect();

        Self {
            settings: Settings::default(),
            thresholds,
            actions: default_actions(),
            enabled_gestures,
        }
    }
}

fn default_actions() -> BTreeMap<ExpressionKey, Action> {
    BTreeMap::from([
        (ExpressionKey::MouthOpen, Action::Press("a".to_string())),
        (ExpressionKey::EyebrowsRaised, Action::Press("enter".to_string())),
        (ExpressionKey::Smile, Action::Write(":)".to_string())),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file, filling missing keys
    /// with defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, Format::of(path))
    }

    fn parse(content: &str, format: Format) -> Result<Self> {
        let raw: RawConfig = match format {
            Format::Yaml => serde_yaml::from_str(content)
                .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?,
            Format::Json => serde_json::from_str(content)
                .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?,
        };
        Ok(raw.merge_over(Self::default()))
    }

    /// Save configuration in the format implied by the file extension
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match Format::of(path) {
            Format::Yaml => serde_yaml::to_string(self)
                .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path`, falling back to defaults when it is missing, malformed
    /// or invalid
    #[must_use]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(path).and_then(|config| config.validate().map(|()| config)) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {e}. Using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Whether `key` is monitored; unknown keys count as enabled
    #[must_use]
    pub fn is_enabled(&self, key: ExpressionKey) -> bool {
        self.enabled_gestures.get(&key).copied().unwrap_or(true)
    }

    /// Enabled expressions in key order
    pub fn enabled_keys(&self) -> impl Iterator<Item = ExpressionKey> + '_ {
        ExpressionKey::ALL.into_iter().filter(|&key| self.is_enabled(key))
    }

    /// Threshold for `key`, falling back to its built-in default
    #[must_use]
    pub fn threshold(&self, key: ExpressionKey) -> f64 {
        self.thresholds
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.default_threshold())
    }

    /// Action bound to `key`, if any
    #[must_use]
    pub fn action(&self, key: ExpressionKey) -> Option<&Action> {
        self.actions.get(&key)
    }

    /// Parameters for a calibration run
    #[must_use]
    pub const fn calibration_settings(&self) -> CalibrationSettings {
        CalibrationSettings {
            frames_to_collect: self.settings.frames_to_collect,
            threshold_factor: self.settings.threshold_factor,
            wink_threshold_factor: self.settings.wink_threshold_factor,
        }
    }

    /// Tick period for real-time pacing
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.settings.tick_interval_ms)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        for (key, action) in &self.actions {
            action
                .validate()
                .map_err(|e| Error::ConfigError(format!("Action for {key}: {e}")))?;
        }

        Ok(())
    }
}

impl Settings {
    /// Validate every setting
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.hold_frames == 0 {
            return Err(Error::ConfigError("Hold frames must be greater than 0".to_string()));
        }
        if self.frames_to_collect == 0 {
            return Err(Error::ConfigError(
                "Frames to collect must be greater than 0".to_string(),
            ));
        }
        if !(self.threshold_factor > 0.0 && self.threshold_factor <= 1.0) {
            return Err(Error::ConfigError(
                "Threshold factor must be in (0.0, 1.0]".to_string(),
            ));
        }
        if !(self.wink_threshold_factor > 0.0 && self.wink_threshold_factor < 1.0) {
            return Err(Error::ConfigError(
                "Wink threshold factor must be in (0.0, 1.0)".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::ConfigError("Tick interval must be greater than 0".to_string()));
        }
        Ok(())
    }

    fn apply(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "hold_frames" => self.hold_frames = serde_json::from_value(value)?,
            "frames_to_collect" => self.frames_to_collect = serde_json::from_value(value)?,
            "threshold_factor" => self.threshold_factor = serde_json::from_value(value)?,
            "wink_threshold_factor" => self.wink_threshold_factor = serde_json::from_value(value)?,
            "tick_interval_ms" => self.tick_interval_ms = serde_json::from_value(value)?,
            _ => return Err(Error::ConfigError("unknown setting".to_string())),
        }
        Ok(())
    }
}

// Sections as read from disk, before entries are checked one by one
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    settings: BTreeMap<String, Value>,
    thresholds: BTreeMap<String, Value>,
    actions: BTreeMap<String, Value>,
    enabled_gestures: BTreeMap<String, Value>,
}

impl RawConfig {
    /// Overlay every readable entry on `config`; unreadable ones keep their
    /// default and are logged
    fn merge_over(self, mut config: Config) -> Config {
        for (name, value) in self.settings {
            let mut settings = config.settings.clone();
            match settings.apply(&name, value).and_then(|()| settings.validate()) {
                Ok(()) => config.settings = settings,
                Err(e) => warn!("Ignoring setting {name}: {e}"),
            }
        }
        for (name, value) in self.thresholds {
            match entry::<f64>(&name, value) {
                Ok((key, threshold)) if threshold.is_finite() => {
                    config.thresholds.insert(key, threshold);
                }
                Ok(_) => warn!("Ignoring threshold {name}: not a finite number"),
                Err(e) => warn!("Ignoring threshold {name}: {e}"),
            }
        }
        for (name, value) in self.actions {
            match entry::<Action>(&name, value).and_then(|(key, action)| {
                action.validate()?;
                Ok((key, action))
            }) {
                Ok((key, action)) => {
                    config.actions.insert(key, action);
                }
                Err(e) => warn!("Ignoring action {name}: {e}"),
            }
        }
        for (name, value) in self.enabled_gestures {
            match entry::<bool>(&name, value) {
                Ok((key, enabled)) => {
                    config.enabled_gestures.insert(key, enabled);
                }
                Err(e) => warn!("Ignoring enabled flag {name}: {e}"),
            }
        }
        config
    }
}

fn entry<T: DeserializeOwned>(name: &str, value: Value) -> Result<(ExpressionKey, T)> {
    Ok((name.parse()?, serde_json::from_value(value)?))
}

/// Owner of the live configuration and the file backing it
///
/// Readers take a [`snapshot`](Self::snapshot) per tick; updates replace the
/// shared value and persist immediately.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: Arc<Config>,
}

impl ConfigStore {
    /// Wrap `config`, persisting to `path` when one is given
    #[must_use]
    pub fn new(path: Option<PathBuf>, config: Config) -> Self {
        Self {
            path,
            config: Arc::new(config),
        }
    }

    /// Load from `path` (defaults when unusable) and persist there
    #[must_use]
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let config = Config::load_or_default(&path);
        Self::new(Some(path), config)
    }

    /// Store that never touches the filesystem
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::new(None, config)
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Immutable view of the current configuration
    #[must_use]
    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Merge `thresholds` into the stored ones
    ///
    /// # Errors
    ///
    /// Returns an error for a non-finite threshold or if persisting fails.
    pub fn update_thresholds(&mut self, thresholds: &ThresholdSet) -> Result<()> {
        if let Some((key, value)) = thresholds.iter().find(|(_, value)| !value.is_finite()) {
            return Err(Error::ConfigError(format!("Threshold for {key} is not finite: {value}")));
        }
        info!("Updating thresholds: {thresholds:?}");
        self.modify(|config| config.thresholds.extend(thresholds))
    }

    /// Bind `action` to `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the action is empty or persisting fails.
    pub fn update_action(&mut self, key: ExpressionKey, action: Action) -> Result<()> {
        action.validate()?;
        info!("Updating action for {key}: {action}");
        self.modify(|config| {
            config.actions.insert(key, action);
        })
    }

    /// Enable or disable monitoring of `key`
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn update_gesture_enabled(&mut self, key: ExpressionKey, enabled: bool) -> Result<()> {
        info!("Updating enabled status for {key} to {enabled}");
        self.modify(|config| {
            config.enabled_gestures.insert(key, enabled);
        })
    }

    /// Change the debounce length
    ///
    /// # Errors
    ///
    /// Returns an error for zero or if persisting fails.
    pub fn update_hold_frames(&mut self, hold_frames: u32) -> Result<()> {
        if hold_frames == 0 {
            return Err(Error::ConfigError("Hold frames must be greater than 0".to_string()));
        }
        info!("Updating hold frames to {hold_frames}");
        self.modify(|config| config.settings.hold_frames = hold_frames)
    }

    fn modify(&mut self, apply: impl FnOnce(&mut Config)) -> Result<()> {
        apply(Arc::make_mut(&mut self.config));
        self.save()
    }

    /// Write the current configuration to the backing file
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.config.to_file(path),
            None => Ok(()),
        }
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Expression Input Configuration

# Runtime settings
settings:
  hold_frames: 5
  frames_to_collect: 60
  threshold_factor: 0.6
  wink_threshold_factor: 0.5
  tick_interval_ms: 30

# Decision thresholds (overwritten by calibration)
thresholds:
  mouth_open: 0.35
  eyebrows_raised: 0.28
  smile: 0.35
  left_wink: 0.2
  right_wink: 0.2

# Actions: press a key, hold a hotkey combination, or type text
actions:
  mouth_open:
    type: press
    value: a
  eyebrows_raised:
    type: press
    value: enter
  smile:
    type: write
    value: ":)"

# Monitored gestures
enabled_gestures:
  mouth_open: true
  eyebrows_raised: true
  smile: true
  left_wink: true
  right_wink: true
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settings.hold_frames, 5);
        assert_eq!(config.threshold(ExpressionKey::EyebrowsRaised), 0.28);
        assert!(ExpressionKey::ALL.into_iter().all(|key| config.is_enabled(key)));
        assert!(config.action(ExpressionKey::LeftWink).is_none());
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = Config::parse(
            r#"{"thresholds": {"mouth_open": 0.99}, "settings": {"hold_frames": 2}}"#,
            Format::Json,
        )
        .unwrap();

        assert_eq!(config.threshold(ExpressionKey::MouthOpen), 0.99);
        assert_eq!(config.threshold(ExpressionKey::Smile), 0.35);
        assert_eq!(config.settings.hold_frames, 2);
        assert_eq!(config.settings.frames_to_collect, 60);
        assert_eq!(
            config.action(ExpressionKey::EyebrowsRaised),
            Some(&Action::Press("enter".to_string()))
        );
    }

    #[test]
    fn test_unreadable_entries_keep_defaults() {
        let config = Config::parse(
            "settings:\n  hold_frames: 9\n  frames_to_collect: -1\n  volume: 3\n\
             thresholds:\n  smile: 0.5\n  blink: 0.1\n  mouth_open: wide\n\
             actions:\n  smile:\n    type: shout\n    value: hi\n  mouth_open:\n    type: press\n    value: b\n\
             enabled_gestures:\n  left_wink: false\n  nose: true\n",
            Format::Yaml,
        )
        .unwrap();

        assert_eq!(config.settings.hold_frames, 9);
        assert_eq!(config.settings.frames_to_collect, 60);
        assert_eq!(config.threshold(ExpressionKey::Smile), 0.5);
        assert_eq!(config.threshold(ExpressionKey::MouthOpen), 0.35);
        assert_eq!(
            config.action(ExpressionKey::Smile),
            Some(&Action::Write(":)".to_string()))
        );
        assert_eq!(
            config.action(ExpressionKey::MouthOpen),
            Some(&Action::Press("b".to_string()))
        );
        assert!(!config.is_enabled(ExpressionKey::LeftWink));
    }

    #[test]
    fn test_non_map_section_is_malformed() {
        assert!(Config::parse(r#"{"thresholds": 5}"#, Format::Json).is_err());
    }

    #[test]
    fn test_missing_threshold_falls_back() {
        let mut config = Config::default();
        config.thresholds.clear();
        config.enabled_gestures.clear();
        assert_eq!(config.threshold(ExpressionKey::RightWink), 0.2);
        assert!(config.is_enabled(ExpressionKey::RightWink));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.settings.threshold_factor = 1.0;
        assert!(config.validate().is_ok());
        config.settings.threshold_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.settings.wink_threshold_factor = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.settings.hold_frames = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.actions.insert(ExpressionKey::Smile, Action::Write(String::new()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_snapshot_is_isolated_from_updates() {
        let mut store = ConfigStore::in_memory(Config::default());
        let before = store.snapshot();
        store.update_hold_frames(9).unwrap();
        assert_eq!(before.settings.hold_frames, 5);
        assert_eq!(store.snapshot().settings.hold_frames, 9);
        assert!(store.update_hold_frames(0).is_err());
    }

    #[test]
    fn test_non_finite_threshold_update_is_rejected() {
        let mut store = ConfigStore::in_memory(Config::default());
        let update = ThresholdSet::from([(ExpressionKey::Smile, 0.4), (ExpressionKey::MouthOpen, f64::NAN)]);
        assert!(store.update_thresholds(&update).is_err());
        assert_eq!(store.snapshot().threshold(ExpressionKey::Smile), 0.35);
    }
}
