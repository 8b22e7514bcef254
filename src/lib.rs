//! Expression input library: hands-free keyboard control from facial
//! expressions.
//!
//! Face landmarks from an external detector flow through a fixed pipeline:
//! 1. Scale-invariant ratios are computed per frame (mouth opening, eyebrow
//!    height, smile width, eye aspect ratio per eye)
//! 2. Ratios are compared against per-expression thresholds
//! 3. Sustained expressions are debounced into one-shot triggers
//! 4. Triggers fire the configured key press, hotkey or text
//!
//! Thresholds come from the configuration or from an interactive
//! calibration run that samples the user's neutral and active faces.
//!
//! # Examples
//!
//! ## Computing Ratios
//!
//! ```
//! use expression_keys::{landmarks::LandmarkFrame, ratios::ExpressionRatios};
//!
//! let mut frame = LandmarkFrame::zeroed();
//! // Outer eye corners 0.2 apart, lips 0.06 apart
//! frame.set(33, 0.40, 0.40);
//! frame.set(263, 0.60, 0.40);
//! frame.set(13, 0.50, 0.60);
//! frame.set(14, 0.50, 0.66);
//!
//! let ratios = ExpressionRatios::compute(Some(&frame));
//! assert!((ratios.mouth_open.unwrap() - 0.3).abs() < 1e-9);
//! ```
//!
//! ## Debouncing Triggers
//!
//! ```
//! use expression_keys::{config::Config, expression::ExpressionKey, trigger::TriggerCounter};
//!
//! let config = Config::default();
//! let mut counter = TriggerCounter::new();
//! let fired: Vec<bool> = (0..6)
//!     .map(|_| counter.update(ExpressionKey::Smile, true, true, config.settings.hold_frames))
//!     .collect();
//! assert_eq!(fired, [false, false, false, false, true, false]);
//! ```
//!
//! ## Complete Pipeline Example
//!
//! ```no_run
//! use expression_keys::{
//!     action::LogInjector,
//!     app::{AppOptions, ExpressionApp},
//!     config::ConfigStore,
//!     landmark_source::ReplaySource,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ConfigStore::open("config.json");
//! let source = ReplaySource::open("recording.jsonl")?;
//! let options = AppOptions { calibrate: true, realtime: false };
//!
//! let mut app = ExpressionApp::new(store, source, LogInjector::new(), options);
//! let summary = app.run()?;
//! println!("{} actions fired", summary.total_fired());
//! # Ok(())
//! # }
//! ```

/// Landmark points and frames
pub mod landmarks;

/// Expression ratio computation
pub mod ratios;

/// Monitored expressions and calibration phases
pub mod expression;

/// Sample statistics for calibration
pub mod statistics;

/// Calibration state machine and threshold derivation
pub mod calibrator;

/// Threshold comparison and hold-frame debouncing
pub mod trigger;

/// Per-frame orchestration of calibration and triggering
pub mod frame_cycle;

/// Landmark frame sources and recording playback
pub mod landmark_source;

/// Action descriptors and the input injection boundary
pub mod action;

/// Keyboard control module for X11 systems
pub mod keyboard_control;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
