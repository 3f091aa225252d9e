//! # Semistatic CFR
//!
//! Regret-matching+ CFR for two-player zero-sum extensive-form games, with a
//! static best-response mode and a self-play engine for measuring strategies.
//!
//! ## Features
//!
//! - **Generic CFR Engine**: Works with any game implementing the `Game` trait
//! - **Static Best Response**: Train a learner against a frozen opponent policy
//! - **Action-Selection Bias**: Skew a fixed policy toward one action
//! - **Self-Play**: Seat-swapped experiments, sequential or on rayon
//! - **Exploitability Tracking**: Sparse snapshots over training
//!
//! ## Quick Start
//!
//! ```ignore
//! use semistatic_cfr::cfr::{BestResponseOracle, CFRConfig, CFRSolver};
//! use semistatic_cfr::training::Trainer;
//!
//! let mut solver = CFRSolver::new(game, CFRConfig::default())?;
//! let oracle = BestResponseOracle::new();
//! let session = Trainer::new(&mut solver, "nes").with_oracle(&oracle).run(1_000)?.clone();
//! let nes = solver.average_policy();
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: Solver, policies and exploitability
//! - [`games`]: Game implementations (Kuhn Poker)
//! - [`play`]: Agents and self-play experiments
//! - [`training`]: Training loop and snapshot series
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Trainer (snapshots on schedule)                │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                        │                      │
//!          ▼                        ▼                      ▼
//!   ┌─────────────┐        ┌─────────────────┐    ┌────────────────┐
//!   │ CFR Solver  │        │  Exploitability │    │   Experiment   │
//!   │ (RM+ / BR)  │        │     Oracle      │    │   (self-play)  │
//!   └─────────────┘        └─────────────────┘    └────────────────┘
//!          │                        │                      │
//!          └────────────────────────┼──────────────────────┘
//!                                   │ Game trait
//!                                   ▼
//!                            ┌─────────────┐
//!                            │ Kuhn Poker  │
//!                            └─────────────┘
//! ```

#![warn(missing_docs)]

/// CFR (Counterfactual Regret Minimization) solver module.
///
/// This is the core module containing the generic CFR algorithm.
pub mod cfr;

/// Game implementations module.
///
/// Contains Kuhn Poker for testing and validation.
pub mod games;

/// Self-play evaluation between agents.
pub mod play;

/// Training loop with exploitability and payoff tracking.
pub mod training;

// Re-export commonly used types at crate root for convenience
pub use cfr::{
    Action, CFRConfig, CFRSolver, CFRStats, Game, GameState, InfoState, Policy, TabularPolicy,
};
pub use play::{Agent, Experiment, ExperimentConfig, ExperimentOutcome};
pub use training::{Schedule, Trainer, TrainingSession};
