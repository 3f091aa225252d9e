//! CFR (Counterfactual Regret Minimization) Solver Module.
//!
//! This module provides a generic regret-matching+ solver for two-player
//! zero-sum extensive-form games, and its static best-response variant.
//!
//! # Overview
//!
//! CFR is an iterative algorithm that converges to Nash equilibrium by:
//! 1. Computing counterfactual regret for each action at each decision point
//! 2. Updating strategies to minimize regret over time
//! 3. Averaging strategies across iterations to converge to equilibrium
//!
//! # Modes
//!
//! - **Two-sided CFR+**: every player adapts; regret-matching+ with linear
//!   averaging and alternating updates by default.
//! - **Static best response** ("semistatic"): one side is a frozen policy,
//!   the learner converges to a best response against it.
//!
//! Both modes share one traversal; see [`solver::SeatPolicy`].
//!
//! # Usage
//!
//! 1. Implement the `Game` trait for your game
//! 2. Create a `CFRSolver` with your game and configuration
//! 3. Call `train()` to run iterations
//! 4. Snapshot strategies with `average_policy()` / `current_policy()`
//! 5. Measure them with an `ExploitabilityOracle`
//!
//! # Example
//!
//! ```ignore
//! use semistatic_cfr::cfr::{BestResponseOracle, CFRConfig, CFRSolver, ExploitabilityOracle};
//!
//! let game = MyGame::new();
//! let mut solver = CFRSolver::new(game.clone(), CFRConfig::default())?;
//! solver.train(1_000)?;
//!
//! let nes = solver.average_policy();
//! let distance = BestResponseOracle::new().exploitability(&game, &nes)?;
//! println!("Exploitability after 1000 iterations: {:.5}", distance);
//! ```
//!
//! # Theory
//!
//! CFR is based on the principle of regret minimization:
//!
//! **Regret**: The difference between the value of an action and the value of the current strategy.
//! ```text
//! Regret(a) = Value(a) - Value(current_strategy)
//! ```
//!
//! **Regret Matching**: Set strategy proportional to positive regrets.
//! ```text
//! Strategy(a) = max(0, Regret(a)) / sum(max(0, Regret(a')))
//! ```
//!
//! **Regret Matching+**: After every pass, clamp cumulative regret at zero.
//!
//! **Linear averaging**: Iteration `t` contributes to the average strategy
//! with weight proportional to `t`.
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete Information" (2007)
//! - Tammelin, O. "Solving Large Imperfect Information Games Using CFR+" (2014)
//! - Tammelin, O., et al. "Solving Heads-up Limit Texas Hold'em" (2015)

pub mod config;
pub mod error;
pub mod exploitability;
pub mod game;
pub mod policy;
pub mod solver;
pub mod storage;

// Re-export main types for convenient access
pub use config::{CFRConfig, CFRStats, ConfigError};
pub use error::{PersistenceError, SolverError};
pub use exploitability::{BestResponseOracle, ExploitabilityOracle};
pub use game::{Action, Game, GameState, InfoState};
pub use policy::{ActionSelectionBias, Policy, SeatwisePolicy, SharedPolicy, TabularPolicy};
pub use solver::{CFRSolver, SeatPolicy, SolverState};
pub use storage::{InfoStateEntry, RegretTable, StorageExport};
