//! Sparse snapshot series and the training session that owns them.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cfr::config::ConfigError;
use crate::cfr::error::{PersistenceError, SolverError};

/// Errors that can occur while training.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// Solver, policy or oracle failure.
    Solver(SolverError),
    /// A series write at or before the latest recorded iteration.
    NonMonotonicSnapshot {
        /// Iteration of the rejected write.
        iteration: u64,
        /// Latest iteration already recorded.
        last: u64,
    },
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::Solver(err) => write!(f, "{}", err),
            TrainingError::NonMonotonicSnapshot { iteration, last } => write!(
                f,
                "Snapshot at iteration {} does not follow the latest snapshot at {}",
                iteration, last
            ),
        }
    }
}

impl std::error::Error for TrainingError {}

impl From<SolverError> for TrainingError {
    fn from(err: SolverError) -> Self {
        TrainingError::Solver(err)
    }
}

impl From<ConfigError> for TrainingError {
    fn from(err: ConfigError) -> Self {
        TrainingError::Solver(SolverError::Config(err))
    }
}

/// Iterations at which the trainer takes a snapshot.
///
/// Every iteration up to `dense_iterations`, then every `stride`-th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Snapshot every iteration up to and including this one.
    pub dense_iterations: u64,
    /// Snapshot every multiple of this afterwards.
    pub stride: u64,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            dense_iterations: 10,
            stride: 10,
        }
    }
}

impl Schedule {
    /// Create a schedule.
    pub fn new(dense_iterations: u64, stride: u64) -> Result<Self, ConfigError> {
        let schedule = Self {
            dense_iterations,
            stride,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Validate the schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stride == 0 {
            return Err(ConfigError::ZeroStride);
        }
        Ok(())
    }

    /// Whether a snapshot is due after `iteration`.
    pub fn is_scheduled(&self, iteration: u64) -> bool {
        iteration <= self.dense_iterations || iteration % self.stride.max(1) == 0
    }
}

/// Values keyed by iteration; append-only with strictly increasing keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseSeries(BTreeMap<u64, f64>);

impl SparseSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Rejects keys at or before the latest one.
    pub fn record(&mut self, iteration: u64, value: f64) -> Result<(), TrainingError> {
        if let Some(last) = self.last_iteration() {
            if iteration <= last {
                return Err(TrainingError::NonMonotonicSnapshot { iteration, last });
            }
        }
        self.0.insert(iteration, value);
        Ok(())
    }

    /// Value recorded at `iteration`.
    pub fn get(&self, iteration: u64) -> Option<f64> {
        self.0.get(&iteration).copied()
    }

    /// Latest recorded iteration.
    pub fn last_iteration(&self) -> Option<u64> {
        self.0.keys().next_back().copied()
    }

    /// Latest recorded `(iteration, value)`.
    pub fn last(&self) -> Option<(u64, f64)> {
        self.0.iter().next_back().map(|(&k, &v)| (k, v))
    }

    /// Recorded iterations in increasing order.
    pub fn iterations(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }

    /// `(iteration, value)` pairs in increasing iteration order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    /// Number of recorded points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One series for the average strategy and one for the current strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySeries {
    /// Measurements of the average strategy.
    pub average: SparseSeries,
    /// Measurements of the current strategy (static mode only).
    pub current: SparseSeries,
}

/// Everything recorded over a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Title used in logs and file names.
    pub title: String,
    /// Solver iterations completed when the session last advanced.
    pub iterations: u64,
    /// Exploitability snapshots.
    pub exploitability: PolicySeries,
    /// Self-play mean return of the learner against its opponent.
    pub payoff: PolicySeries,
}

impl TrainingSession {
    /// Create an empty session.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Save the session as JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a session saved with [`TrainingSession::save_json`].
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
