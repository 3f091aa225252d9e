//! Errors raised by the solver, policies and game-engine validation.

use crate::cfr::config::ConfigError;

/// Errors that can occur while traversing a game or querying a policy.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// A tabular policy has no entry for a queried information state.
    MissingInfoState(String),
    /// A distribution does not sum to 1 or holds negative entries.
    InvalidDistribution {
        /// Where the distribution came from.
        context: String,
        /// Sum of the offending distribution.
        sum: f64,
    },
    /// A distribution's length differs from the legal-action count.
    ActionCountMismatch {
        /// Information state key.
        key: String,
        /// Number of legal actions at the state.
        expected: usize,
        /// Number of probabilities supplied.
        found: usize,
    },
    /// The game engine reported an inconsistent state.
    InvalidState(String),
    /// Action-selection bias weight is negative or not finite.
    InvalidBias(f64),
    /// Learner seat does not exist in the game.
    InvalidLearner(usize),
    /// Solver configuration was rejected.
    Config(ConfigError),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::MissingInfoState(key) => {
                write!(f, "Policy has no entry for information state '{}'", key)
            }
            SolverError::InvalidDistribution { context, sum } => {
                write!(f, "Invalid probability distribution from {} (sum {})", context, sum)
            }
            SolverError::ActionCountMismatch { key, expected, found } => write!(
                f,
                "Information state '{}' has {} legal actions but {} probabilities",
                key, expected, found
            ),
            SolverError::InvalidState(description) => {
                write!(f, "Invalid game state: {}", description)
            }
            SolverError::InvalidBias(weight) => {
                write!(f, "Bias weight {} must be finite and non-negative", weight)
            }
            SolverError::InvalidLearner(player) => {
                write!(f, "Learner seat {} does not exist", player)
            }
            SolverError::Config(err) => write!(f, "Invalid configuration: {}", err),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<ConfigError> for SolverError {
    fn from(err: ConfigError) -> Self {
        SolverError::Config(err)
    }
}

/// Errors from saving or loading policies and reports.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// Reading or writing the file failed.
    IoError(String),
    /// The file content is not valid JSON for the expected type.
    ParseError(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::IoError(msg) => write!(f, "IO error: {}", msg),
            PersistenceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::ParseError(e.to_string())
    }
}
