//! Monitored expressions and the calibration phases that sample them.

use crate::constants::{
    DEFAULT_EYEBROWS_RAISED_THRESHOLD, DEFAULT_MOUTH_OPEN_THRESHOLD, DEFAULT_SMILE_THRESHOLD,
    DEFAULT_WINK_THRESHOLD,
};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Decision thresholds keyed by expression; partial when calibration
/// could only derive some of them
pub type ThresholdSet = BTreeMap<ExpressionKey, f64>;

/// A facial expression that can be bound to an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionKey {
    /// Mouth held open
    MouthOpen,
    /// Both eyebrows raised
    EyebrowsRaised,
    /// Wide smile
    Smile,
    /// Left eye closed while the right stays open
    LeftWink,
    /// Right eye closed while the left stays open
    RightWink,
}

impl ExpressionKey {
    /// Every monitored expression, in display order
    pub const ALL: [Self; 5] = [
        Self::MouthOpen,
        Self::EyebrowsRaised,
        Self::Smile,
        Self::LeftWink,
        Self::RightWink,
    ];

    /// Configuration key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MouthOpen => "mouth_open",
            Self::EyebrowsRaised => "eyebrows_raised",
            Self::Smile => "smile",
            Self::LeftWink => "left_wink",
            Self::RightWink => "right_wink",
        }
    }

    /// Title-cased name for summaries and logs
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::MouthOpen => "Mouth Open",
            Self::EyebrowsRaised => "Eyebrows Raised",
            Self::Smile => "Smile",
            Self::LeftWink => "Left Wink",
            Self::RightWink => "Right Wink",
        }
    }

    /// Threshold used when neither calibration nor the config provides one
    #[must_use]
    pub const fn default_threshold(self) -> f64 {
        match self {
            Self::MouthOpen => DEFAULT_MOUTH_OPEN_THRESHOLD,
            Self::EyebrowsRaised => DEFAULT_EYEBROWS_RAISED_THRESHOLD,
            Self::Smile => DEFAULT_SMILE_THRESHOLD,
            Self::LeftWink | Self::RightWink => DEFAULT_WINK_THRESHOLD,
        }
    }

    /// Calibration phase that samples this expression actively, if any.
    /// Winks are derived from the neutral phase alone.
    #[must_use]
    pub const fn active_phase(self) -> Option<ActivePhase> {
        match self {
            Self::MouthOpen => Some(ActivePhase::Mouth),
            Self::EyebrowsRaised => Some(ActivePhase::Eyebrows),
            Self::Smile => Some(ActivePhase::Smile),
            Self::LeftWink | Self::RightWink => None,
        }
    }
}

impl fmt::Display for ExpressionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpressionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown expression key: {s}")))
    }
}

/// A calibration phase in which the user performs one gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivePhase {
    /// Mouth opened wide
    Mouth,
    /// Eyebrows raised high
    Eyebrows,
    /// Natural smile
    Smile,
}

impl ActivePhase {
    /// Canonical order in which active phases run
    pub const ORDER: [Self; 3] = [Self::Mouth, Self::Eyebrows, Self::Smile];

    /// Expression this phase calibrates
    #[must_use]
    pub const fn key(self) -> ExpressionKey {
        match self {
            Self::Mouth => ExpressionKey::MouthOpen,
            Self::Eyebrows => ExpressionKey::EyebrowsRaised,
            Self::Smile => ExpressionKey::Smile,
        }
    }

    /// Instruction shown to the user while the phase runs
    #[must_use]
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::Mouth => "Open Mouth Wide",
            Self::Eyebrows => "Raise Eyebrows High",
            Self::Smile => "Smile Naturally",
        }
    }
}

impl fmt::Display for ActivePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mouth => "mouth",
            Self::Eyebrows => "eyebrows",
            Self::Smile => "smile",
        })
    }
}
