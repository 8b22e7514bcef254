//! Per-tick coordination of calibration and expression triggering.
//!
//! While capture runs, every tick either feeds the calibrator or computes the
//! expression states and advances the trigger counters. Configuration is
//! passed in per tick and never retained.

use crate::{
    calibrator::{CalibrationPhase, Calibrator},
    config::Config,
    expression::{ExpressionKey, ThresholdSet},
    landmarks::LandmarkFrame,
    ratios::ExpressionRatios,
    trigger::{detect_expressions, ExpressionStates, TriggerCounter},
    Error, Result,
};
use log::{debug, info};

/// How a calibration run ended
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Thresholds were derived; hand them to the configuration store
    Succeeded {
        /// Derived thresholds
        thresholds: ThresholdSet,
        /// Human readable listing
        summary: String,
    },
    /// Derivation failed
    Failed {
        /// Message to present to the user
        message: String,
    },
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Capture is stopped
    Idle,
    /// Calibration consumed the frame
    Calibrating {
        /// Current instruction for the user
        instruction: String,
    },
    /// Calibration finished on this frame; the cycle is back to detecting
    CalibrationFinished(CalibrationOutcome),
    /// Expressions were evaluated
    Detecting {
        /// Active flag per expression
        states: ExpressionStates,
        /// Expressions whose hold count was reached on this frame
        fired: Vec<ExpressionKey>,
    },
}

/// Owner of the calibrator and trigger counters for one capture session
#[derive(Debug, Default)]
pub struct FrameCycle {
    calibrator: Calibrator,
    triggers: TriggerCounter,
    capturing: bool,
}

impl FrameCycle {
    /// Create a stopped cycle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether frames are being processed
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Whether a calibration run is in progress
    #[must_use]
    pub const fn is_calibrating(&self) -> bool {
        self.calibrator.is_calibrating()
    }

    /// Calibration state machine
    #[must_use]
    pub const fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    /// Per-expression hold counters
    #[must_use]
    pub const fn triggers(&self) -> &TriggerCounter {
        &self.triggers
    }

    /// Begin processing frames
    pub fn start_capture(&mut self) {
        if !self.capturing {
            info!("Capture started");
        }
        self.capturing = true;
    }

    /// Stop processing frames, aborting calibration and zeroing counters
    pub fn stop_capture(&mut self) {
        if self.capturing {
            info!("Capture stopped");
        }
        self.capturing = false;
        self.calibrator.cancel();
        self.triggers.reset();
    }

    /// Begin a calibration run over the gestures `config` enables
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] when capture is stopped, a run is already in
    /// progress, or no gesture is enabled.
    pub fn start_calibration(&mut self, config: &Config) -> Result<()> {
        if !self.capturing {
            return Err(Error::Capture("Start capture before calibrating".to_string()));
        }
        if self.calibrator.is_calibrating() {
            return Err(Error::Capture("Calibration already running".to_string()));
        }
        let enabled: Vec<_> = config.enabled_keys().collect();
        if enabled.is_empty() {
            return Err(Error::Capture("No gestures enabled for calibration".to_string()));
        }

        self.triggers.reset();
        self.calibrator.start(enabled, config.calibration_settings())
    }

    /// Record a gesture switch; disabling zeroes that gesture's counter
    pub fn set_gesture_enabled(&mut self, key: ExpressionKey, enabled: bool) {
        if !enabled {
            self.triggers.reset_key(key);
        }
    }

    /// Process one frame; `None` means no face was detected
    pub fn tick(&mut self, frame: Option<&LandmarkFrame>, config: &Config) -> TickOutcome {
        if !self.capturing {
            return TickOutcome::Idle;
        }

        if self.calibrator.is_calibrating() {
            self.calibrator.process_landmarks(frame);
            return self.calibration_outcome();
        }

        let ratios = ExpressionRatios::compute(frame);
        let states = detect_expressions(&ratios, config);
        let fired = self.triggers.update_all(&states, config);
        debug!("Expression states {states:?}");
        TickOutcome::Detecting { states, fired }
    }

    fn calibration_outcome(&mut self) -> TickOutcome {
        let outcome = match self.calibrator.phase() {
            CalibrationPhase::Done {
                thresholds,
                summary,
            } => CalibrationOutcome::Succeeded {
                thresholds: thresholds.clone(),
                summary: summary.clone(),
            },
            CalibrationPhase::Error(_) => CalibrationOutcome::Failed {
                message: self.calibrator.error_message().unwrap_or_default(),
            },
            _ => {
                return TickOutcome::Calibrating {
                    instruction: self.calibrator.instruction().to_string(),
                }
            }
        };

        self.calibrator.cancel();
        self.triggers.reset();
        TickOutcome::CalibrationFinished(outcome)
    }
}
