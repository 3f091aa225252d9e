//! Regret-matching+ CFR solver with a static best-response mode.
//!
//! One traversal serves both modes. Each seat reads its strategy from a
//! [`SeatPolicy`]: `Adaptive` seats read the shared regret table, `Frozen`
//! seats read an external policy and never accumulate regret.
//!
//! - **Two-sided** ([`CFRSolver::new`]): both players adapt; the average
//!   strategy approaches a Nash equilibrium.
//! - **Static best response** ([`CFRSolver::static_best_response`]): the
//!   learner adapts against a frozen opponent policy; the average strategy
//!   approaches a best response to it.
//!
//! The solver is generic over any game that implements the `Game` trait.

use std::time::Instant;

use crate::cfr::config::{CFRConfig, CFRStats, ConfigError};
use crate::cfr::error::SolverError;
use crate::cfr::game::{
    acting_player, enumerate_info_states, legal_actions, terminal_returns, validate_distribution,
    Game, InfoState,
};
use crate::cfr::policy::{Policy, SeatwisePolicy, SharedPolicy, TabularPolicy};
use crate::cfr::storage::{uniform, RegretTable, StorageExport};

/// Where a seat's strategy comes from during a traversal.
#[derive(Clone)]
pub enum SeatPolicy<G: Game> {
    /// Reads (and, when updating, writes) the regret table.
    Adaptive,
    /// Reads an external policy; contributes no regret.
    Frozen(SharedPolicy<G>),
}

/// The regret-matching+ solver.
///
/// # Example
/// ```ignore
/// use semistatic_cfr::cfr::{CFRSolver, CFRConfig};
///
/// let mut solver = CFRSolver::new(game, CFRConfig::default())?;
/// solver.train(1_000)?;
/// let nes = solver.average_policy();
/// ```
pub struct CFRSolver<G: Game> {
    /// The game being solved.
    game: G,

    /// Configuration for the solver.
    config: CFRConfig,

    /// Regrets and strategy weights.
    table: RegretTable,

    /// Players whose regrets are updated, in update order.
    learners: Vec<usize>,

    /// Frozen policy for non-learning seats, if any.
    frozen: Option<SharedPolicy<G>>,

    /// Current iteration count.
    iteration: u64,

    /// Statistics tracking.
    stats: CFRStats,
}

impl<G: Game> CFRSolver<G> {
    /// Create a two-sided solver: every player adapts.
    pub fn new(game: G, config: CFRConfig) -> Result<Self, SolverError> {
        let learners = (0..game.num_players()).collect();
        Self::build(game, config, learners, None)
    }

    /// Create a static best-response solver against `frozen`.
    ///
    /// The learner occupies every seat in turn, each time against the frozen
    /// policy in the other seat, so the result answers the frozen strategy
    /// from either position.
    pub fn static_best_response(
        game: G,
        config: CFRConfig,
        frozen: SharedPolicy<G>,
    ) -> Result<Self, SolverError> {
        let learners = (0..game.num_players()).collect();
        Self::build(game, config, learners, Some(frozen))
    }

    /// Create a static best-response solver for the given learner seats only.
    ///
    /// Seats not listed always play `frozen`.
    pub fn with_learners(
        game: G,
        config: CFRConfig,
        frozen: SharedPolicy<G>,
        learners: Vec<usize>,
    ) -> Result<Self, SolverError> {
        if learners.is_empty() {
            return Err(ConfigError::NoLearners.into());
        }
        if let Some(&bad) = learners.iter().find(|&&p| p >= game.num_players()) {
            return Err(SolverError::InvalidLearner(bad));
        }
        Self::build(game, config, learners, Some(frozen))
    }

    fn build(
        game: G,
        config: CFRConfig,
        learners: Vec<usize>,
        frozen: Option<SharedPolicy<G>>,
    ) -> Result<Self, SolverError> {
        config.validate()?;
        let infos = enumerate_info_states(&game)?;
        let mut table = RegretTable::with_capacity(infos.len());
        for info in infos.into_iter().filter(|i| learners.contains(&i.player)) {
            table.entry_or_insert(&info.key, info.player, || info.action_names);
        }

        let solver = Self {
            game,
            config,
            table,
            learners,
            frozen,
            iteration: 0,
            stats: CFRStats::new(),
        };

        if solver.frozen.is_some() {
            solver.check_frozen_coverage()?;
        }
        log::debug!(
            "solver tracks {} information states for learners {:?}",
            solver.table.num_info_sets(),
            solver.learners
        );
        Ok(solver)
    }

    /// Verify the frozen policy answers every state a learner pass can reach.
    fn check_frozen_coverage(&self) -> Result<(), SolverError> {
        for &player in &self.learners {
            let seats = self.seats_for(player);
            self.check_frozen_subtree(&self.game.initial_state(), &seats)?;
        }
        Ok(())
    }

    fn check_frozen_subtree(&self, state: &G::State, seats: &[SeatPolicy<G>]) -> Result<(), SolverError> {
        if self.game.is_terminal(state) {
            return Ok(());
        }
        if self.game.is_chance(state) {
            for (outcome, _) in self.game.chance_outcomes(state) {
                self.check_frozen_subtree(&self.game.apply_action(state, &outcome), seats)?;
            }
            return Ok(());
        }

        let current = acting_player(&self.game, state)?;
        if let SeatPolicy::Frozen(policy) = &seats[current] {
            let probs = policy.action_probabilities(&self.game, state)?;
            validate_distribution(&self.frozen_context(state), &probs)?;
        }
        for action in legal_actions(&self.game, state)? {
            self.check_frozen_subtree(&self.game.apply_action(state, &action), seats)?;
        }
        Ok(())
    }

    /// Seat policies for a pass that updates `player`.
    ///
    /// In static mode every other seat plays the frozen policy, including
    /// seats that learn in their own pass.
    fn seats_for(&self, player: usize) -> Vec<SeatPolicy<G>> {
        (0..self.game.num_players())
            .map(|seat| match &self.frozen {
                Some(policy) if seat != player => SeatPolicy::Frozen(policy.clone()),
                _ => SeatPolicy::Adaptive,
            })
            .collect()
    }

    /// Run a single iteration: one regret pass per learner.
    pub fn evaluate_and_update_policy(&mut self) -> Result<(), SolverError> {
        self.iteration += 1;
        let num_players = self.game.num_players();
        let root = self.game.initial_state();

        for player in self.learners.clone() {
            let seats = self.seats_for(player);
            let reach = vec![1.0; num_players + 1];
            self.traverse(&root, player, &seats, &reach)?;

            if self.config.alternating_updates {
                self.apply_regret_matching();
            }
        }

        if !self.config.alternating_updates {
            self.apply_regret_matching();
        }
        Ok(())
    }

    fn apply_regret_matching(&mut self) {
        if self.config.regret_matching_plus {
            self.table.reset_negative_regrets();
        }
        self.table.rebuild_current_strategy();
    }

    /// Train the solver for a specified number of iterations.
    pub fn train(&mut self, iterations: u64) -> Result<&CFRStats, SolverError> {
        self.train_with_callback(iterations, u64::MAX, |_| {})
    }

    /// Train with a callback invoked every `callback_interval` iterations.
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<&CFRStats, SolverError>
    where
        F: FnMut(&CFRStats),
    {
        let start_time = Instant::now();
        let interval = callback_interval.max(1);

        for i in 0..iterations {
            self.evaluate_and_update_policy()?;

            if (i + 1) % interval == 0 {
                self.refresh_stats(start_time);
                callback(&self.stats);
            }
        }

        self.refresh_stats(start_time);
        Ok(&self.stats)
    }

    fn refresh_stats(&mut self, start_time: Instant) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.table.num_info_sets();
        self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        self.stats.update_rate();
    }

    /// Counterfactual traversal returning the value for `player`.
    ///
    /// `reach` holds one reach probability per player plus chance in the
    /// last slot.
    fn traverse(
        &mut self,
        state: &G::State,
        player: usize,
        seats: &[SeatPolicy<G>],
        reach: &[f64],
    ) -> Result<f64, SolverError> {
        if self.game.is_terminal(state) {
            return Ok(terminal_returns(&self.game, state)?[player]);
        }

        let num_players = self.game.num_players();
        if reach[..num_players].iter().all(|&r| r == 0.0) {
            return Ok(0.0);
        }

        if self.game.is_chance(state) {
            return self.traverse_chance(state, player, seats, reach);
        }

        let current = acting_player(&self.game, state)?;
        let actions = legal_actions(&self.game, state)?;
        let key = self.game.info_state(state).key();
        let strategy = self.seat_strategy(state, current, &key, &seats[current], actions.len())?;

        let mut action_values = vec![0.0; actions.len()];
        let mut node_value = 0.0;
        for (i, action) in actions.iter().enumerate() {
            let mut child_reach = reach.to_vec();
            child_reach[current] *= strategy[i];
            let child = self.game.apply_action(state, action);
            action_values[i] = self.traverse(&child, player, seats, &child_reach)?;
            node_value += strategy[i] * action_values[i];
        }

        if current == player {
            // Opponents and chance
            let counterfactual_reach: f64 = reach
                .iter()
                .enumerate()
                .filter(|&(seat, _)| seat != player)
                .map(|(_, &r)| r)
                .product();
            let regrets: Vec<f64> = action_values
                .iter()
                .map(|&v| counterfactual_reach * (v - node_value))
                .collect();

            self.table.add_regrets(&key, &regrets);
            let weight = reach[player] * self.config.averaging_weight(self.iteration);
            self.table.accumulate_average(&key, weight);
        }

        Ok(node_value)
    }

    fn traverse_chance(
        &mut self,
        state: &G::State,
        player: usize,
        seats: &[SeatPolicy<G>],
        reach: &[f64],
    ) -> Result<f64, SolverError> {
        let outcomes = self.game.chance_outcomes(state);
        let probs: Vec<f64> = outcomes.iter().map(|(_, p)| *p).collect();
        validate_distribution(
            &format!("chance outcomes at {}", self.game.state_description(state)),
            &probs,
        )?;

        let chance_slot = self.game.num_players();
        let mut value = 0.0;
        for (outcome, prob) in &outcomes {
            let mut child_reach = reach.to_vec();
            child_reach[chance_slot] *= prob;
            let child = self.game.apply_action(state, outcome);
            value += prob * self.traverse(&child, player, seats, &child_reach)?;
        }
        Ok(value)
    }

    /// Strategy the acting seat plays at this node.
    fn seat_strategy(
        &mut self,
        state: &G::State,
        current: usize,
        key: &str,
        seat: &SeatPolicy<G>,
        num_actions: usize,
    ) -> Result<Vec<f64>, SolverError> {
        let strategy = match seat {
            SeatPolicy::Adaptive => {
                let game = &self.game;
                let entry = self.table.entry_or_insert(key, current, || {
                    game.legal_actions(state).iter().map(|a| game.action_name(a)).collect()
                });
                entry.current_strategy.clone()
            }
            SeatPolicy::Frozen(policy) => {
                let probs = policy.action_probabilities(&self.game, state)?;
                validate_distribution(&self.frozen_context(state), &probs)?;
                probs
            }
        };

        if strategy.len() != num_actions {
            return Err(SolverError::ActionCountMismatch {
                key: key.to_string(),
                expected: num_actions,
                found: strategy.len(),
            });
        }
        Ok(strategy)
    }

    fn frozen_context(&self, state: &G::State) -> String {
        format!("frozen policy at {}", self.game.state_description(state))
    }

    /// Snapshot of the current strategy of every tracked state.
    pub fn current_policy(&self) -> TabularPolicy<G::Action> {
        TabularPolicy::new(self.table.current_strategies())
    }

    /// Snapshot of the average strategy of every tracked state.
    ///
    /// States that were never reached carry a uniform distribution.
    pub fn average_policy(&self) -> TabularPolicy<G::Action> {
        TabularPolicy::new(self.table.average_strategies())
    }

    /// Complete a learner snapshot into a policy covering every seat.
    ///
    /// Seats that never learn are filled with the frozen policy.
    pub fn measurement_policy(&self, snapshot: TabularPolicy<G::Action>) -> SharedPolicy<G> {
        let snapshot: SharedPolicy<G> = std::sync::Arc::new(snapshot);
        match &self.frozen {
            Some(frozen) if self.learners.len() < self.game.num_players() => {
                let seats = (0..self.game.num_players())
                    .map(|seat| {
                        if self.learners.contains(&seat) {
                            snapshot.clone()
                        } else {
                            frozen.clone()
                        }
                    })
                    .collect();
                std::sync::Arc::new(SeatwisePolicy::new(seats))
            }
            _ => snapshot,
        }
    }

    /// Current strategy at one information state, uniform if untracked.
    pub fn get_current_strategy(&self, info_key: &str, num_actions: usize) -> Vec<f64> {
        self.table
            .current_strategy(info_key)
            .map(<[f64]>::to_vec)
            .unwrap_or_else(|| uniform(num_actions))
    }

    /// Average strategy at one information state, uniform if untracked.
    pub fn get_average_strategy(&self, info_key: &str, num_actions: usize) -> Vec<f64> {
        self.table
            .average_strategy(info_key)
            .unwrap_or_else(|| uniform(num_actions))
    }

    /// Whether this solver plays against a frozen policy.
    pub fn is_static(&self) -> bool {
        self.frozen.is_some()
    }

    /// Frozen opponent policy, if any.
    pub fn frozen_policy(&self) -> Option<&SharedPolicy<G>> {
        self.frozen.as_ref()
    }

    /// Learner seats.
    pub fn learners(&self) -> &[usize] {
        &self.learners
    }

    /// Get the current iteration count.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get the number of tracked information states.
    pub fn num_info_sets(&self) -> usize {
        self.table.num_info_sets()
    }

    /// Get current statistics.
    pub fn stats(&self) -> &CFRStats {
        &self.stats
    }

    /// Get reference to the regret table for analysis.
    pub fn table(&self) -> &RegretTable {
        &self.table
    }

    /// Get reference to the game.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &CFRConfig {
        &self.config
    }

    /// Export solver state for checkpointing.
    pub fn export_state(&self) -> SolverState {
        SolverState {
            iteration: self.iteration,
            storage: self.table.export(),
            stats: self.stats.clone(),
        }
    }

    /// Import solver state from checkpoint.
    pub fn import_state(&mut self, state: SolverState) {
        self.iteration = state.iteration;
        self.table.import(state.storage);
        self.stats = state.stats;
    }
}

/// Serializable solver state for checkpointing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SolverState {
    /// Current iteration.
    pub iteration: u64,
    /// Regret table export.
    pub storage: StorageExport,
    /// Statistics.
    pub stats: CFRStats,
}
