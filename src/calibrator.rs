//! Interactive calibration of per-expression detection thresholds.
//!
//! A run first samples the user's neutral face, then one active phase per
//! enabled gesture in canonical order (mouth, eyebrows, smile). Each phase
//! collects a fixed number of valid frames. Once the last phase completes,
//! thresholds are derived from the sample means:
//!
//! - gestures with an active phase: `neutral + factor * (active - neutral)`
//! - winks: `neutral_ear * wink_factor`, skipped when the neutral eye aspect
//!   ratio looks implausibly low
//!
//! Failures never escape as errors; they park the calibrator in
//! [`CalibrationPhase::Error`] with a message for the caller to present.

use crate::{
    constants::{
        DEFAULT_FRAMES_TO_COLLECT, DEFAULT_THRESHOLD_FACTOR, DEFAULT_WINK_THRESHOLD_FACTOR,
        EAR_SANITY_FLOOR, NOMINAL_FPS, THRESHOLD_DECIMALS,
    },
    expression::{ActivePhase, ExpressionKey, ThresholdSet},
    landmarks::LandmarkFrame,
    ratios::{ExpressionRatios, RatioSample},
    statistics::{round_to, Statistics},
    Result,
};
use log::{debug, info, warn};
use std::{cmp::Ordering, collections::BTreeSet};
use thiserror::Error;

/// Parameters of one calibration run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSettings {
    /// Valid frames each phase must collect before advancing
    pub frames_to_collect: usize,
    /// Fraction of the neutral-to-active distance where the threshold sits
    pub threshold_factor: f64,
    /// Fraction of the neutral eye aspect ratio below which an eye is closed
    pub wink_threshold_factor: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            frames_to_collect: DEFAULT_FRAMES_TO_COLLECT,
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            wink_threshold_factor: DEFAULT_WINK_THRESHOLD_FACTOR,
        }
    }
}

impl CalibrationSettings {
    /// Smallest sample count a phase may contribute to derivation
    #[must_use]
    pub fn min_samples(&self) -> usize {
        (self.frames_to_collect / 4).max(1)
    }

    fn phase_seconds(&self) -> usize {
        self.frames_to_collect / NOMINAL_FPS
    }
}

/// Why threshold derivation failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    /// A neutral ratio series is shorter than the minimum sample count
    #[error("Not enough data collected during neutral phase")]
    InsufficientNeutralData,

    /// An active phase series is shorter than the minimum sample count
    #[error("Not enough data collected for {}", spoken(.0))]
    InsufficientActiveData(ExpressionKey),

    /// The gesture did not move its ratio above the neutral baseline
    #[error("Active {} ratio not higher than neutral", spoken(.0))]
    NotAboveNeutral(ExpressionKey),

    /// Every enabled key was skipped
    #[error("No thresholds could be calculated")]
    NoThresholds,
}

fn spoken(key: &ExpressionKey) -> String {
    key.as_str().replace('_', " ")
}

/// Where the calibrator is in its protocol
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationPhase {
    /// No run in progress
    Idle,
    /// Sampling the relaxed face
    Neutral,
    /// Sampling one gesture
    Active(ActivePhase),
    /// Deriving thresholds from the collected samples
    Calculating,
    /// Run finished with thresholds
    Done {
        /// Derived thresholds, only for keys that could be derived
        thresholds: ThresholdSet,
        /// Human readable listing of the thresholds
        summary: String,
    },
    /// Run finished without thresholds
    Error(CalibrationError),
}

impl CalibrationPhase {
    /// Whether frames are still being consumed
    #[must_use]
    pub const fn is_collecting(&self) -> bool {
        matches!(self, Self::Neutral | Self::Active(_) | Self::Calculating)
    }

    /// Whether the run has ended, successfully or not
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error(_))
    }

    fn label(&self) -> Option<&'static str> {
        match self {
            Self::Neutral => Some("Look Neutral"),
            Self::Active(phase) => Some(phase.instruction()),
            _ => None,
        }
    }
}

/// Samples accumulated during one calibration attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationRun {
    enabled_keys: BTreeSet<ExpressionKey>,
    active_phases: Vec<ActivePhase>,
    frame_count: usize,
    neutral: NeutralSamples,
    mouth: Vec<f64>,
    eyebrows: Vec<f64>,
    smile: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct NeutralSamples {
    mouth_open: Vec<f64>,
    eyebrows_raised: Vec<f64>,
    smile: Vec<f64>,
    left_ear: Vec<f64>,
    right_ear: Vec<f64>,
}

impl CalibrationRun {
    /// Fresh run for the given enabled keys; active phases follow the
    /// canonical order filtered to the enabled gestures
    #[must_use]
    pub fn new(enabled_keys: impl IntoIterator<Item = ExpressionKey>) -> Self {
        let enabled_keys: BTreeSet<_> = enabled_keys.into_iter().collect();
        let active_phases = ActivePhase::ORDER
            .into_iter()
            .filter(|phase| enabled_keys.contains(&phase.key()))
            .collect();
        Self {
            enabled_keys,
            active_phases,
            ..Self::default()
        }
    }

    /// Keys this run derives thresholds for
    #[must_use]
    pub const fn enabled_keys(&self) -> &BTreeSet<ExpressionKey> {
        &self.enabled_keys
    }

    /// Active phases this run walks through after the neutral phase
    #[must_use]
    pub fn active_phases(&self) -> &[ActivePhase] {
        &self.active_phases
    }

    /// Valid frames collected in the current phase
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Append a neutral frame; the neutral phase keeps every ratio
    pub fn record_neutral(&mut self, sample: &RatioSample) {
        self.neutral.mouth_open.push(sample.mouth_open);
        self.neutral.eyebrows_raised.push(sample.eyebrows_raised);
        self.neutral.smile.push(sample.smile);
        self.neutral.left_ear.push(sample.left_ear);
        self.neutral.right_ear.push(sample.right_ear);
    }

    /// Append the ratio a gesture phase is sampling
    pub fn record_active(&mut self, phase: ActivePhase, sample: &RatioSample) {
        match phase {
            ActivePhase::Mouth => self.mouth.push(sample.mouth_open),
            ActivePhase::Eyebrows => self.eyebrows.push(sample.eyebrows_raised),
            ActivePhase::Smile => self.smile.push(sample.smile),
        }
    }

    /// Neutral series backing `key`; winks map to their eye's aspect ratio
    #[must_use]
    pub fn neutral_series(&self, key: ExpressionKey) -> &[f64] {
        match key {
            ExpressionKey::MouthOpen => &self.neutral.mouth_open,
            ExpressionKey::EyebrowsRaised => &self.neutral.eyebrows_raised,
            ExpressionKey::Smile => &self.neutral.smile,
            ExpressionKey::LeftWink => &self.neutral.left_ear,
            ExpressionKey::RightWink => &self.neutral.right_ear,
        }
    }

    /// Series collected during an active phase
    #[must_use]
    pub fn active_series(&self, phase: ActivePhase) -> &[f64] {
        match phase {
            ActivePhase::Mouth => &self.mouth,
            ActivePhase::Eyebrows => &self.eyebrows,
            ActivePhase::Smile => &self.smile,
        }
    }

    /// Phase to enter once `current` has collected its frames
    fn phase_after(&self, current: &CalibrationPhase) -> CalibrationPhase {
        let next = match current {
            CalibrationPhase::Neutral => self.active_phases.first(),
            CalibrationPhase::Active(phase) => self
                .active_phases
                .iter()
                .skip_while(|p| *p != phase)
                .nth(1),
            _ => None,
        };
        next.map_or(CalibrationPhase::Calculating, |phase| CalibrationPhase::Active(*phase))
    }
}

/// Derive thresholds from a finished run
///
/// # Errors
///
/// Returns the first [`CalibrationError`] hit; no partial result is kept.
pub fn derive_thresholds(
    run: &CalibrationRun,
    settings: &CalibrationSettings,
) -> std::result::Result<ThresholdSet, CalibrationError> {
    let min_samples = settings.min_samples();

    if ExpressionKey::ALL
        .into_iter()
        .any(|key| run.neutral_series(key).len() < min_samples)
    {
        return Err(CalibrationError::InsufficientNeutralData);
    }

    let mut thresholds = ThresholdSet::new();
    for &key in &run.enabled_keys {
        let neutral = series_stats(run.neutral_series(key), CalibrationError::InsufficientNeutralData)?;

        match key.active_phase() {
            Some(phase) => {
                if !run.active_phases.contains(&phase) {
                    continue;
                }
                let active_samples = run.active_series(phase);
                if active_samples.len() < min_samples {
                    return Err(CalibrationError::InsufficientActiveData(key));
                }
                let active = series_stats(active_samples, CalibrationError::InsufficientActiveData(key))?;
                debug!("{key}: neutral {neutral:?}, active {active:?}");

                if active.mean.partial_cmp(&neutral.mean) != Some(Ordering::Greater) {
                    return Err(CalibrationError::NotAboveNeutral(key));
                }
                let threshold = neutral.mean + settings.threshold_factor * (active.mean - neutral.mean);
                thresholds.insert(key, round_to(threshold, THRESHOLD_DECIMALS));
            }
            None => {
                let left = mean(run.neutral_series(ExpressionKey::LeftWink));
                let right = mean(run.neutral_series(ExpressionKey::RightWink));
                if [left, right].iter().any(|ear| ear.is_nan() || *ear < EAR_SANITY_FLOOR) {
                    warn!(
                        "Skipping {key} threshold: neutral eye aspect ratios too low (left {left:.4}, right {right:.4})"
                    );
                    continue;
                }
                debug!("{key}: neutral {neutral:?}");
                let threshold = neutral.mean * settings.wink_threshold_factor;
                thresholds.insert(key, round_to(threshold, THRESHOLD_DECIMALS));
            }
        }
    }

    if thresholds.is_empty() {
        return Err(CalibrationError::NoThresholds);
    }
    Ok(thresholds)
}

fn series_stats(
    data: &[f64],
    missing: CalibrationError,
) -> std::result::Result<Statistics, CalibrationError> {
    Statistics::of(data).ok_or(missing)
}

fn mean(data: &[f64]) -> f64 {
    Statistics::of(data).map_or(0.0, |stats| stats.mean)
}

/// Calibration state machine driven one landmark frame at a time
#[derive(Debug, Clone)]
pub struct Calibrator {
    settings: CalibrationSettings,
    phase: CalibrationPhase,
    run: CalibrationRun,
    instruction: String,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(CalibrationSettings::default())
    }
}

impl Calibrator {
    /// Create an idle calibrator
    #[must_use]
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            phase: CalibrationPhase::Idle,
            run: CalibrationRun::default(),
            instruction: String::new(),
        }
    }

    /// Begin a new run, discarding everything from any previous one.
    ///
    /// # Errors
    ///
    /// Currently always succeeds.
    pub fn start(
        &mut self,
        enabled_keys: impl IntoIterator<Item = ExpressionKey>,
        settings: CalibrationSettings,
    ) -> Result<()> {
        self.settings = settings;
        self.run = CalibrationRun::new(enabled_keys);
        self.phase = CalibrationPhase::Neutral;
        self.instruction = format!(
            "Look Neutral (Gathering base data for {} sec...)",
            self.settings.phase_seconds()
        );

        info!(
            "Starting calibration for {:?}, active phases {:?}",
            self.run.enabled_keys, self.run.active_phases
        );
        Ok(())
    }

    /// Abort any run and return to idle
    pub fn cancel(&mut self) {
        if self.is_calibrating() {
            info!("Calibration cancelled in phase {:?}", self.phase);
        }
        self.phase = CalibrationPhase::Idle;
        self.run = CalibrationRun::default();
        self.instruction.clear();
    }

    /// Whether a run is consuming frames
    #[must_use]
    pub const fn is_calibrating(&self) -> bool {
        self.phase.is_collecting()
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> &CalibrationPhase {
        &self.phase
    }

    /// Settings of the current or last run
    #[must_use]
    pub const fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Data of the current or last run
    #[must_use]
    pub const fn run(&self) -> &CalibrationRun {
        &self.run
    }

    /// Text telling the user what to do right now
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Derived thresholds, available only after a successful run
    #[must_use]
    pub const fn calculated_thresholds(&self) -> Option<&ThresholdSet> {
        match &self.phase {
            CalibrationPhase::Done { thresholds, .. } => Some(thresholds),
            _ => None,
        }
    }

    /// Summary of a successful run
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        match &self.phase {
            CalibrationPhase::Done { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Message describing why the last run failed
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match &self.phase {
            CalibrationPhase::Error(err) => Some(format!("Calc Error: {err}.")),
            _ => None,
        }
    }

    /// Feed one frame; `None` means no face was detected
    pub fn process_landmarks(&mut self, frame: Option<&LandmarkFrame>) {
        let Some(label) = self.phase.label() else {
            return;
        };

        let Some(frame) = frame else {
            self.flag_instruction("No face detected!");
            return;
        };

        // Every ratio must be available, even those no enabled gesture uses
        let ratios = ExpressionRatios::compute(Some(frame));
        let Some(sample) = ratios.complete() else {
            warn!("Skipping calibration frame with unavailable ratio: {ratios:?}");
            self.flag_instruction("Ratio Error!");
            return;
        };
        debug!("Calibration frame in {:?}: {sample:?}", self.phase);

        match self.phase {
            CalibrationPhase::Neutral => self.run.record_neutral(&sample),
            CalibrationPhase::Active(phase) => self.run.record_active(phase, &sample),
            _ => return,
        }
        self.run.frame_count += 1;
        self.instruction = format!(
            "{label} ({}/{})",
            self.run.frame_count, self.settings.frames_to_collect
        );

        if self.run.frame_count >= self.settings.frames_to_collect {
            self.advance();
        }
    }

    fn advance(&mut self) {
        let next = self.run.phase_after(&self.phase);
        info!("Calibration phase {:?} complete, entering {:?}", self.phase, next);
        self.run.frame_count = 0;

        match next {
            CalibrationPhase::Active(phase) => {
                self.instruction = format!(
                    "{} for {} sec...",
                    phase.instruction(),
                    self.settings.phase_seconds()
                );
                self.phase = CalibrationPhase::Active(phase);
            }
            _ => {
                self.phase = CalibrationPhase::Calculating;
                self.instruction = "Calculating thresholds...".to_string();
                self.finish();
            }
        }
    }

    fn finish(&mut self) {
        match derive_thresholds(&self.run, &self.settings) {
            Ok(thresholds) => {
                let summary = thresholds
                    .iter()
                    .map(|(key, value)| format!("{}: {value}", key.display_name()))
                    .collect::<Vec<_>>()
                    .join(", ");
                info!("Calibration complete: {summary}");
                self.instruction = format!("Calibration Complete! {summary}");
                self.phase = CalibrationPhase::Done { thresholds, summary };
            }
            Err(err) => {
                warn!("Calibration failed: {err}");
                self.instruction = format!("Error: {err}");
                self.phase = CalibrationPhase::Error(err);
            }
        }
    }

    fn flag_instruction(&mut self, flag: &str) {
        let base = self
            .instruction
            .split(" (")
            .next()
            .unwrap_or_default()
            .to_string();
        self.instruction = format!("{base} ({flag})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(frames: usize) -> CalibrationSettings {
        CalibrationSettings {
            frames_to_collect: frames,
            ..CalibrationSettings::default()
        }
    }

    fn sample(mouth: f64, brows: f64, smile: f64) -> RatioSample {
        RatioSample {
            mouth_open: mouth,
            eyebrows_raised: brows,
            smile,
            left_ear: 0.35,
            right_ear: 0.36,
        }
    }

    #[test]
    fn test_new_calibrator_is_idle() {
        let calibrator = Calibrator::default();
        assert_eq!(calibrator.phase(), &CalibrationPhase::Idle);
        assert!(!calibrator.is_calibrating());
        assert!(calibrator.calculated_thresholds().is_none());
        assert!(calibrator.error_message().is_none());
    }

    #[test]
    fn test_min_samples() {
        assert_eq!(settings(60).min_samples(), 15);
        assert_eq!(settings(3).min_samples(), 1);
        assert_eq!(settings(10).min_samples(), 2);
    }

    #[test]
    fn test_phase_after_skips_disabled_phases() {
        let run = CalibrationRun::new([ExpressionKey::MouthOpen, ExpressionKey::Smile]);
        assert_eq!(
            run.phase_after(&CalibrationPhase::Neutral),
            CalibrationPhase::Active(ActivePhase::Mouth)
        );
        assert_eq!(
            run.phase_after(&CalibrationPhase::Active(ActivePhase::Mouth)),
            CalibrationPhase::Active(ActivePhase::Smile)
        );
        assert_eq!(
            run.phase_after(&CalibrationPhase::Active(ActivePhase::Smile)),
            CalibrationPhase::Calculating
        );
    }

    #[test]
    fn test_winks_only_run_goes_straight_to_calculating() {
        let run = CalibrationRun::new([ExpressionKey::LeftWink]);
        assert!(run.active_phases().is_empty());
        assert_eq!(run.phase_after(&CalibrationPhase::Neutral), CalibrationPhase::Calculating);
    }

    #[test]
    fn test_derive_thresholds_formula() {
        let mut run = CalibrationRun::new([ExpressionKey::MouthOpen]);
        for _ in 0..4 {
            run.record_neutral(&sample(0.1, 0.2, 0.5));
            run.record_active(ActivePhase::Mouth, &sample(0.7, 0.2, 0.5));
        }
        let thresholds = derive_thresholds(&run, &settings(4)).unwrap();
        assert_eq!(thresholds.len(), 1);
        assert!((thresholds[&ExpressionKey::MouthOpen] - 0.46).abs() < 1e-12);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CalibrationError::InsufficientActiveData(ExpressionKey::MouthOpen).to_string(),
            "Not enough data collected for mouth open"
        );
        assert_eq!(
            CalibrationError::NotAboveNeutral(ExpressionKey::Smile).to_string(),
            "Active smile ratio not higher than neutral"
        );
    }

    #[test]
    fn test_flag_instruction_replaces_previous_flag() {
        let mut calibrator = Calibrator::default();
        calibrator.start([ExpressionKey::Smile], settings(3)).unwrap();
        calibrator.process_landmarks(None);
        calibrator.process_landmarks(None);
        assert_eq!(calibrator.instruction(), "Look Neutral (No face detected!)");
    }
}
