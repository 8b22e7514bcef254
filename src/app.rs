//! Main application module tying landmark input to keyboard output.

use crate::{
    action::{execute_action, InputInjector},
    config::{Config, ConfigStore},
    expression::ExpressionKey,
    frame_cycle::{CalibrationOutcome, FrameCycle, TickOutcome},
    landmark_source::{FrameRead, LandmarkSource},
    Result,
};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::thread;
use std::time::Instant;

/// Run options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppOptions {
    /// Start calibrating on the first tick
    pub calibrate: bool,
    /// Pace ticks at the configured interval instead of running flat out
    pub realtime: bool,
}

/// Counters describing a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Ticks processed
    pub frames: usize,
    /// Ticks without a detected face
    pub frames_without_face: usize,
    /// Actions fired per expression
    pub fired: BTreeMap<ExpressionKey, usize>,
    /// Actions the injector failed to deliver
    pub failed_actions: usize,
    /// Outcome of the last calibration run, if one finished
    pub calibration: Option<CalibrationOutcome>,
}

impl RunSummary {
    /// Total actions fired
    #[must_use]
    pub fn total_fired(&self) -> usize {
        self.fired.values().sum()
    }
}

/// Main application struct
pub struct ExpressionApp<S, I> {
    store: ConfigStore,
    source: S,
    injector: I,
    cycle: FrameCycle,
    options: AppOptions,
    summary: RunSummary,
}

impl<S: LandmarkSource, I: InputInjector> ExpressionApp<S, I> {
    /// Create an application over the given collaborators
    pub fn new(store: ConfigStore, source: S, injector: I, options: AppOptions) -> Self {
        info!("Initializing expression input application");
        Self {
            store,
            source,
            injector,
            cycle: FrameCycle::new(),
            options,
            summary: RunSummary::default(),
        }
    }

    /// Configuration store
    #[must_use]
    pub const fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Injector receiving fired actions
    #[must_use]
    pub const fn injector(&self) -> &I {
        &self.injector
    }

    /// Frame cycle driving detection and calibration
    #[must_use]
    pub const fn cycle(&self) -> &FrameCycle {
        &self.cycle
    }

    /// Enable or disable a gesture, persisting the change
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be saved.
    pub fn set_gesture_enabled(&mut self, key: ExpressionKey, enabled: bool) -> Result<()> {
        self.store.update_gesture_enabled(key, enabled)?;
        self.cycle.set_gesture_enabled(key, enabled);
        Ok(())
    }

    /// Run until the landmark source is exhausted
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or calibration cannot start.
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting main application loop");
        self.cycle.start_capture();
        if self.options.calibrate {
            let config = self.store.snapshot();
            self.cycle.start_calibration(&config)?;
        }

        let start_time = Instant::now();
        loop {
            let tick_start = Instant::now();
            if !self.step()? {
                info!("End of landmark stream reached");
                break;
            }

            if self.options.realtime {
                let interval = self.store.snapshot().tick_interval();
                if let Some(remaining) = interval.checked_sub(tick_start.elapsed()) {
                    thread::sleep(remaining);
                }
            }
        }

        self.cycle.stop_capture();
        info!(
            "Processed {} frames in {:.2}s, {} actions fired",
            self.summary.frames,
            start_time.elapsed().as_secs_f64(),
            self.summary.total_fired()
        );
        Ok(std::mem::take(&mut self.summary))
    }

    /// Process one frame; returns `false` once the source is exhausted
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails.
    pub fn step(&mut self) -> Result<bool> {
        let frame = match self.source.next_frame()? {
            FrameRead::Face(frame) => Some(frame),
            FrameRead::NoFace => {
                self.summary.frames_without_face += 1;
                None
            }
            FrameRead::EndOfStream => return Ok(false),
        };
        self.summary.frames += 1;

        // Fresh snapshot every tick so updates apply immediately
        let config = self.store.snapshot();
        let outcome = self.cycle.tick(frame.as_ref(), &config);
        self.handle_outcome(outcome, &config);
        Ok(true)
    }

    fn handle_outcome(&mut self, outcome: TickOutcome, config: &Config) {
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Calibrating { instruction } => debug!("Calibration: {instruction}"),
            TickOutcome::CalibrationFinished(outcome) => {
                match &outcome {
                    CalibrationOutcome::Succeeded { thresholds, summary } => {
                        info!("Calibration Complete! {summary}");
                        if let Err(e) = self.store.update_thresholds(thresholds) {
                            warn!("Failed to save calibrated thresholds: {e}");
                        }
                    }
                    CalibrationOutcome::Failed { message } => warn!("{message}"),
                }
                self.summary.calibration = Some(outcome);
            }
            TickOutcome::Detecting { fired, .. } => {
                for key in fired {
                    self.fire(key, config);
                }
            }
        }
    }

    fn fire(&mut self, key: ExpressionKey, config: &Config) {
        *self.summary.fired.entry(key).or_insert(0) += 1;
        let Some(action) = config.action(key) else {
            info!("{} detected, no action bound", key.display_name());
            return;
        };

        info!("{} detected, executing {action}", key.display_name());
        if let Err(e) = execute_action(&mut self.injector, action) {
            warn!("Failed to execute {action} for {key}: {e}");
            self.summary.failed_actions += 1;
        }
    }
}
