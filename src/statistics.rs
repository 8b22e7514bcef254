//! Summary statistics over collected ratio samples.

/// Statistical summary of a sample series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl Statistics {
    /// Summarize `data`, or `None` for an empty series
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Sample counts are far below 2^52
    pub fn of(data: &[f64]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            count: data.len(),
            mean,
            std_dev: variance.sqrt(),
            min: data.iter().copied().fold(f64::INFINITY, f64::min),
            max: data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// Spread between the extremes
    #[must_use]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Round half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
