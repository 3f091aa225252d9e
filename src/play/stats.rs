//! Confidence intervals over self-play return histories.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors from statistical estimation.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsError {
    /// No samples to estimate from.
    EmptySample,
    /// Confidence level outside (0, 1).
    InvalidInterval(f64),
    /// Zero bootstrap resamples requested.
    ZeroResamples,
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::EmptySample => write!(f, "Cannot estimate from an empty sample"),
            StatsError::InvalidInterval(level) => {
                write!(f, "Confidence level {} must lie strictly between 0 and 1", level)
            }
            StatsError::ZeroResamples => write!(f, "Bootstrap needs at least one resample"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Point estimate of the mean with its bootstrap bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Sample mean.
    pub mean: f64,
    /// Upper bound.
    pub upper: f64,
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ({:.4}, {:.4})", self.mean, self.lower, self.upper)
    }
}

/// Percentile bootstrap interval for the mean of `samples`.
///
/// `interval` is the confidence level, e.g. 0.95.
pub fn confidence_interval<R: Rng>(
    samples: &[f64],
    interval: f64,
    resamples: usize,
    rng: &mut R,
) -> Result<ConfidenceInterval, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySample);
    }
    if !(interval > 0.0 && interval < 1.0) {
        return Err(StatsError::InvalidInterval(interval));
    }
    if resamples == 0 {
        return Err(StatsError::ZeroResamples);
    }

    let n = samples.len();
    let mean = samples.iter().sum::<f64>() / n as f64;

    let mut means: Vec<f64> = (0..resamples)
        .map(|_| (0..n).map(|_| samples[rng.gen_range(0..n)]).sum::<f64>() / n as f64)
        .collect();
    means.sort_by(|a, b| a.total_cmp(b));

    let alpha = 1.0 - interval;
    Ok(ConfidenceInterval {
        lower: percentile(&means, alpha / 2.0),
        mean,
        upper: percentile(&means, 1.0 - alpha / 2.0),
    })
}

/// Nearest-rank percentile of sorted data.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}
