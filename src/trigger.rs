//! Threshold comparison and hold-frame debouncing of expression states.

use crate::{
    config::Config,
    constants::WINK_OPEN_EYE_MARGIN,
    expression::ExpressionKey,
    ratios::ExpressionRatios,
};
use log::debug;
use std::collections::BTreeMap;

/// Per-expression "currently active" flags for one frame
pub type ExpressionStates = BTreeMap<ExpressionKey, bool>;

/// Compare one frame's ratios against the configured thresholds.
///
/// Disabled expressions and expressions whose ratios are unavailable are
/// inactive. A wink needs the winking eye below its threshold while the
/// other eye stays clearly above its own, so a full blink never counts.
#[must_use]
pub fn detect_expressions(ratios: &ExpressionRatios, config: &Config) -> ExpressionStates {
    ExpressionKey::ALL
        .into_iter()
        .map(|key| {
            let active = config.is_enabled(key) && is_active(key, ratios, config);
            (key, active)
        })
        .collect()
}

fn is_active(key: ExpressionKey, ratios: &ExpressionRatios, config: &Config) -> bool {
    let above = |ratio: Option<f64>| ratio.is_some_and(|value| value > config.threshold(key));

    match key {
        ExpressionKey::MouthOpen => above(ratios.mouth_open),
        ExpressionKey::EyebrowsRaised => above(ratios.eyebrows_raised),
        ExpressionKey::Smile => above(ratios.smile),
        ExpressionKey::LeftWink => is_wink(
            ratios.left_ear,
            ratios.right_ear,
            config.threshold(ExpressionKey::LeftWink),
            config.threshold(ExpressionKey::RightWink),
        ),
        ExpressionKey::RightWink => is_wink(
            ratios.right_ear,
            ratios.left_ear,
            config.threshold(ExpressionKey::RightWink),
            config.threshold(ExpressionKey::LeftWink),
        ),
    }
}

fn is_wink(
    closed_ear: Option<f64>,
    open_ear: Option<f64>,
    closed_threshold: f64,
    open_threshold: f64,
) -> bool {
    match (closed_ear, open_ear) {
        (Some(closed), Some(open)) => {
            closed < closed_threshold && open > open_threshold * WINK_OPEN_EYE_MARGIN
        }
        _ => false,
    }
}

/// Consecutive-frame counters that turn sustained expressions into
/// one-shot triggers
#[derive(Debug, Clone, Default)]
pub struct TriggerCounter {
    counts: BTreeMap<ExpressionKey, u32>,
}

impl TriggerCounter {
    /// Create a counter with every expression at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for `key` by one frame.
    ///
    /// Returns `true` on the frame the count reaches `hold_frames` exactly.
    /// Holding past that point does not fire again; the expression must
    /// drop out and build back up first.
    pub fn update(&mut self, key: ExpressionKey, active: bool, enabled: bool, hold_frames: u32) -> bool {
        let count = self.counts.entry(key).or_insert(0);
        if active && enabled {
            *count = count.saturating_add(1);
        } else {
            *count = 0;
        }
        *count == hold_frames
    }

    /// Advance every expression in `states`, returning the keys that fired
    /// this frame in key order
    pub fn update_all(
        &mut self,
        states: &ExpressionStates,
        config: &Config,
    ) -> Vec<ExpressionKey> {
        let hold_frames = config.settings.hold_frames;
        let fired: Vec<_> = states
            .iter()
            .filter_map(|(&key, &active)| {
                self.update(key, active, config.is_enabled(key), hold_frames)
                    .then_some(key)
            })
            .collect();
        if !fired.is_empty() {
            debug!("Hold of {hold_frames} frames reached for {fired:?}");
        }
        fired
    }

    /// Consecutive active frames currently counted for `key`
    #[must_use]
    pub fn count(&self, key: ExpressionKey) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Zero the counter of one expression
    pub fn reset_key(&mut self, key: ExpressionKey) {
        self.counts.remove(&key);
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        self.counts.clear();
    }
}
