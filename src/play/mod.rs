//! Self-play evaluation.
//!
//! Two [`Agent`]s play sampled episodes of a game through an [`Experiment`],
//! which tallies wins and the running mean return of the first agent.
//!
//! ```ignore
//! let config = ExperimentConfig::new("nes vs. nes").with_rounds(10_000).with_seed(7);
//! let experiment = Experiment::new(KuhnPoker::new(), config)?;
//! let outcome = experiment.run([&learner, &opponent])?;
//! println!("average return: {:.4}", outcome.p0_average_return);
//! ```

pub mod agent;
pub mod experiment;
pub mod stats;

pub use agent::Agent;
pub use experiment::{Experiment, ExperimentConfig, ExperimentOutcome};
pub use stats::{confidence_interval, ConfidenceInterval, StatsError};
