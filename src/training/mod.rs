//! Training loop and exploitability tracking.
//!
//! A [`Trainer`] runs solver iterations and, at iteration 0 and on a sparse
//! [`Schedule`], records exploitability and self-play payoff into a
//! [`TrainingSession`]. Every series is keyed by iteration and append-only.

pub mod series;
pub mod trainer;

pub use series::{PolicySeries, Schedule, SparseSeries, TrainingError, TrainingSession};
pub use trainer::{Evaluation, Trainer};
