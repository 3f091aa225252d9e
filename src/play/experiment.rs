//! Self-play experiments between two agents.
//!
//! An experiment plays `rounds` independent episodes. The first half uses the
//! seats as given, the second half swaps them, so first-mover advantage
//! cancels out of the aggregate. Results are always reported for the
//! "player 0" role: the agent passed first, whichever seat it occupies.

use std::fs::OpenOptions;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cfr::config::ConfigError;
use crate::cfr::error::{PersistenceError, SolverError};
use crate::cfr::game::{acting_player, terminal_returns, validate_distribution, Game};
use crate::play::agent::{sample_index, Agent};

/// Configuration of a self-play experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Title used in logs and reports.
    pub title: String,

    /// Number of episodes to play.
    pub rounds: u64,

    /// Keep every player-0 return for later statistical analysis.
    pub save_outcomes: bool,

    /// Random seed for reproducibility. `None` draws a fresh seed.
    pub seed: Option<u64>,

    /// Split the rounds over this many rayon tasks.
    ///
    /// `None` or `Some(1)` plays sequentially from a single random stream.
    pub threads: Option<usize>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            title: "experiment".to_string(),
            rounds: 10_000,
            save_outcomes: false,
            seed: None,
            threads: None,
        }
    }
}

impl ExperimentConfig {
    /// Create a configuration with a title and default settings.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builder method: set the number of rounds.
    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds;
        self
    }

    /// Builder method: keep the return history.
    pub fn with_save_outcomes(mut self, enable: bool) -> Self {
        self.save_outcomes = enable;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set number of parallel tasks.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }
}

/// Aggregate result of an experiment, from the player-0 role's viewpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    /// Episodes recorded.
    pub rounds: u64,
    /// Episodes won by the player-0 role.
    pub p0_wins: u64,
    /// Episodes won by the player-1 role.
    pub p1_wins: u64,
    /// Episodes with equal returns.
    pub draws: u64,
    /// Running mean of the player-0 return.
    pub p0_average_return: f64,
    /// Every player-0 return in episode order, if saved.
    pub p0_returns: Vec<f64>,
}

impl ExperimentOutcome {
    /// Create an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one episode.
    pub fn record(&mut self, p0_return: f64, p1_return: f64, save_outcome: bool) {
        self.rounds += 1;
        self.p0_average_return += (p0_return - self.p0_average_return) / self.rounds as f64;

        if p0_return > p1_return {
            self.p0_wins += 1;
        } else if p0_return < p1_return {
            self.p1_wins += 1;
        } else {
            self.draws += 1;
        }

        if save_outcome {
            self.p0_returns.push(p0_return);
        }
    }

    /// Fold in the episodes of `other`, which come after ours.
    pub fn merge(&mut self, other: ExperimentOutcome) {
        let total = self.rounds + other.rounds;
        if total == 0 {
            return;
        }
        self.p0_average_return = (self.p0_average_return * self.rounds as f64
            + other.p0_average_return * other.rounds as f64)
            / total as f64;
        self.rounds = total;
        self.p0_wins += other.p0_wins;
        self.p1_wins += other.p1_wins;
        self.draws += other.draws;
        self.p0_returns.extend(other.p0_returns);
    }

    /// Win percentage of the player-0 role.
    pub fn p0_win_percentage(&self) -> f64 {
        percentage(self.p0_wins, self.rounds)
    }

    /// Win percentage of the player-1 role.
    pub fn p1_win_percentage(&self) -> f64 {
        percentage(self.p1_wins, self.rounds)
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 * 100.0 / total as f64
}

/// Plays two agents against each other through chance-sampled episodes.
#[derive(Debug, Clone)]
pub struct Experiment<G: Game> {
    game: G,
    config: ExperimentConfig,
}

impl<G: Game> Experiment<G> {
    /// Create an experiment, validating its configuration.
    pub fn new(game: G, config: ExperimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { game, config })
    }

    /// The experiment configuration.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// The game being played.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// Round at which the seats are swapped.
    pub fn swap_point(&self) -> u64 {
        self.config.rounds / 2
    }

    /// Play all rounds. `players[0]` holds the player-0 role throughout.
    pub fn run(&self, players: [&Agent<G>; 2]) -> Result<ExperimentOutcome, SolverError> {
        log::debug!(
            "{}: {} vs. {} over {} rounds",
            self.config.title,
            players[0].description(),
            players[1].description(),
            self.config.rounds
        );

        let seed = self.config.seed.unwrap_or_else(rand::random);
        let outcome = match self.config.threads {
            Some(threads) if threads > 1 => self.run_parallel(players, seed, threads)?,
            _ => {
                let mut rng = StdRng::seed_from_u64(seed);
                self.play_range(players, 0..self.config.rounds, &mut rng)?
            }
        };

        log::debug!(
            "{}: player 0 wins {:.2}% (vs. {:.2}%), average return {:.4}",
            self.config.title,
            outcome.p0_win_percentage(),
            outcome.p1_win_percentage(),
            outcome.p0_average_return
        );
        Ok(outcome)
    }

    /// Split the rounds into `tasks` contiguous chunks played in parallel.
    ///
    /// Chunk `c` draws from its own stream seeded with `seed + c`; chunks are
    /// merged in round order, so results depend only on the seed and `tasks`.
    pub fn run_parallel(
        &self,
        players: [&Agent<G>; 2],
        seed: u64,
        tasks: usize,
    ) -> Result<ExperimentOutcome, SolverError> {
        let rounds = self.config.rounds;
        let per_task = rounds.div_ceil(tasks as u64);

        let chunks: Vec<ExperimentOutcome> = (0..tasks as u64)
            .into_par_iter()
            .map(|c| {
                let start = (c * per_task).min(rounds);
                let end = ((c + 1) * per_task).min(rounds);
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(c));
                self.play_range(players, start..end, &mut rng)
            })
            .collect::<Result<_, _>>()?;

        let mut outcome = ExperimentOutcome::new();
        for chunk in chunks {
            outcome.merge(chunk);
        }
        Ok(outcome)
    }

    /// Play the episodes with global indices in `rounds`.
    fn play_range<R: Rng>(
        &self,
        players: [&Agent<G>; 2],
        rounds: Range<u64>,
        rng: &mut R,
    ) -> Result<ExperimentOutcome, SolverError> {
        let swap_point = self.swap_point();
        let mut outcome = ExperimentOutcome::new();

        for round in rounds {
            let (seats, p0_seat) = if round < swap_point {
                ([players[0], players[1]], 0)
            } else {
                ([players[1], players[0]], 1)
            };
            let returns = self.play_through(seats, rng)?;
            outcome.record(returns[p0_seat], returns[1 - p0_seat], self.config.save_outcomes);
        }
        Ok(outcome)
    }

    /// Play one episode with `seats[i]` acting for player `i`.
    pub fn play_through<R: Rng>(
        &self,
        seats: [&Agent<G>; 2],
        rng: &mut R,
    ) -> Result<Vec<f64>, SolverError> {
        let game = &self.game;
        let mut state = game.initial_state();

        while !game.is_terminal(&state) {
            let action = if game.is_chance(&state) {
                let mut outcomes = game.chance_outcomes(&state);
                let probs: Vec<f64> = outcomes.iter().map(|(_, p)| *p).collect();
                validate_distribution("chance outcomes", &probs)?;
                outcomes.swap_remove(sample_index(&probs, rng)).0
            } else {
                let player = acting_player(game, &state)?;
                let agent = seats.get(player).ok_or(SolverError::InvalidLearner(player))?;
                agent.choose_action(game, &state, rng)?
            };
            state = game.apply_action(&state, &action);
        }

        terminal_returns(game, &state)
    }

    /// Append a plain-text summary of `outcome` to the report at `path`.
    pub fn write_report<P: AsRef<Path>>(
        &self,
        players: [&Agent<G>; 2],
        outcome: &ExperimentOutcome,
        path: P,
    ) -> Result<(), PersistenceError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "\n*****")?;
        writeln!(file, "Meta info:")?;
        writeln!(file, "Time: {}", timestamp)?;
        writeln!(file, "Title: {}", self.config.title)?;
        writeln!(file, "Player 0: {}", players[0].description())?;
        writeln!(file, "Player 1: {}", players[1].description())?;
        writeln!(file, "*****\n")?;
        writeln!(file, "Results after {} rounds:\n", outcome.rounds)?;
        writeln!(file, "Player 0 win percentage: {:.2}%", outcome.p0_win_percentage())?;
        writeln!(file, "Player 1 win percentage: {:.2}%", outcome.p1_win_percentage())?;
        writeln!(file, "Average return for Player 0: {}", outcome.p0_average_return)?;
        Ok(())
    }
}
