//! Configuration options for the CFR solver.
//!
//! This module provides configuration structs that control the behavior
//! of the regret-matching+ solver, plus the statistics it tracks.

use serde::{Deserialize, Serialize};

/// Configuration for the CFR solver.
///
/// # Example
/// ```
/// use semistatic_cfr::cfr::CFRConfig;
///
/// let config = CFRConfig::default();
/// assert!(config.regret_matching_plus);
/// assert!(config.linear_averaging);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CFRConfig {
    /// Clamp negative cumulative regret to zero after every pass (CFR+).
    pub regret_matching_plus: bool,

    /// Weight average-strategy contributions by the iteration index.
    ///
    /// When disabled every iteration contributes with weight 1.
    pub linear_averaging: bool,

    /// Exponent applied to the iteration index for linear averaging.
    ///
    /// `1` gives weight `t`, `2` gives weight `t^2`.
    pub averaging_exponent: u32,

    /// Update players one after another within an iteration.
    ///
    /// With alternating updates the second player's pass already sees the
    /// first player's freshly rebuilt strategy. Otherwise both passes read
    /// the same snapshot and the table is rebuilt once at the end.
    pub alternating_updates: bool,
}

impl Default for CFRConfig {
    fn default() -> Self {
        Self {
            regret_matching_plus: true,
            linear_averaging: true,
            averaging_exponent: 1,
            alternating_updates: true,
        }
    }
}

impl CFRConfig {
    /// Create a new CFRConfig with default settings (CFR+).
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain CFR: no regret clamping, uniform averaging, simultaneous updates.
    pub fn vanilla() -> Self {
        Self {
            regret_matching_plus: false,
            linear_averaging: false,
            averaging_exponent: 1,
            alternating_updates: false,
        }
    }

    /// Builder method: set whether to clamp negative regrets.
    pub fn with_regret_matching_plus(mut self, enable: bool) -> Self {
        self.regret_matching_plus = enable;
        self
    }

    /// Builder method: set whether to use linear averaging.
    pub fn with_linear_averaging(mut self, enable: bool) -> Self {
        self.linear_averaging = enable;
        self
    }

    /// Builder method: set the averaging exponent.
    pub fn with_averaging_exponent(mut self, exponent: u32) -> Self {
        self.averaging_exponent = exponent;
        self
    }

    /// Builder method: set whether players are updated alternately.
    pub fn with_alternating_updates(mut self, enable: bool) -> Self {
        self.alternating_updates = enable;
        self
    }

    /// Weight of iteration `iteration` in the average strategy.
    pub fn averaging_weight(&self, iteration: u64) -> f64 {
        if self.linear_averaging {
            (iteration as f64).powi(self.averaging_exponent as i32)
        } else {
            1.0
        }
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.linear_averaging && !(1..=3).contains(&self.averaging_exponent) {
            return Err(ConfigError::InvalidAveragingExponent(self.averaging_exponent));
        }
        Ok(())
    }
}

/// Errors that can occur when validating configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Averaging exponent is out of range [1, 3].
    InvalidAveragingExponent(u32),
    /// An experiment must play at least one round.
    ZeroRounds,
    /// Thread count must be positive.
    ZeroThreads,
    /// Snapshot stride must be positive.
    ZeroStride,
    /// A static solver needs at least one learner seat.
    NoLearners,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidAveragingExponent(val) => {
                write!(f, "Averaging exponent {} is out of range [1, 3]", val)
            }
            ConfigError::ZeroRounds => write!(f, "Experiment must play at least one round"),
            ConfigError::ZeroThreads => write!(f, "Thread count must be positive"),
            ConfigError::ZeroStride => write!(f, "Snapshot stride must be positive"),
            ConfigError::NoLearners => write!(f, "At least one learner seat is required"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Statistics tracked during CFR training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CFRStats {
    /// Total number of iterations completed.
    pub iterations: u64,

    /// Number of tracked information states.
    pub info_sets: usize,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Iterations per second.
    pub iterations_per_second: f64,
}

impl CFRStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update iterations per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cfr_plus() {
        let config = CFRConfig::default();
        assert!(config.regret_matching_plus);
        assert!(config.linear_averaging);
        assert!(config.alternating_updates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_averaging_weight() {
        let linear = CFRConfig::default();
        assert_eq!(linear.averaging_weight(7), 7.0);

        let squared = CFRConfig::default().with_averaging_exponent(2);
        assert_eq!(squared.averaging_weight(3), 9.0);

        let uniform = CFRConfig::default().with_linear_averaging(false);
        assert_eq!(uniform.averaging_weight(50), 1.0);
    }

    #[test]
    fn test_invalid_exponent_rejected() {
        let config = CFRConfig::default().with_averaging_exponent(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidAveragingExponent(0)));

        // Exponent is irrelevant without linear averaging
        let config = config.with_linear_averaging(false);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip_preserves_builders() {
        let config = CFRConfig::vanilla().with_alternating_updates(true);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: CFRConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(!parsed.regret_matching_plus);
    }
}
