//! Exploitability of a policy via exact best response.
//!
//! The best responder picks, at each of its information states, the action
//! maximizing value summed over every history in that state weighted by the
//! opponents' and chance reach. Suitable for games small enough to walk the
//! full tree.

use rustc_hash::FxHashMap;

use crate::cfr::error::SolverError;
use crate::cfr::game::{
    acting_player, legal_actions, terminal_returns, validate_distribution, Game, InfoState,
};
use crate::cfr::policy::Policy;

/// Measures distance from equilibrium: `exploitability(game, policy) >= 0`.
pub trait ExploitabilityOracle<G: Game> {
    /// Scalar distance from optimal play; lower is closer to equilibrium.
    fn exploitability(&self, game: &G, policy: &dyn Policy<G>) -> Result<f64, SolverError>;
}

/// Exact best-response oracle over the full game tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestResponseOracle;

impl BestResponseOracle {
    /// Create a new oracle.
    pub fn new() -> Self {
        Self
    }

    /// Sum over players of best-response value minus on-policy value.
    pub fn nash_conv<G: Game>(&self, game: &G, policy: &dyn Policy<G>) -> Result<f64, SolverError> {
        let on_policy = expected_returns(game, policy)?;
        let mut total = 0.0;
        for player in 0..game.num_players() {
            total += best_response_value(game, policy, player)? - on_policy[player];
        }
        Ok(total)
    }
}

impl<G: Game> ExploitabilityOracle<G> for BestResponseOracle {
    fn exploitability(&self, game: &G, policy: &dyn Policy<G>) -> Result<f64, SolverError> {
        let nash_conv = self.nash_conv(game, policy)?;
        // Rounding can push an equilibrium a hair below zero
        Ok((nash_conv / game.num_players() as f64).max(0.0))
    }
}

/// Expected return of every player when all seats follow `policy`.
pub fn expected_returns<G: Game>(game: &G, policy: &dyn Policy<G>) -> Result<Vec<f64>, SolverError> {
    expected_returns_from(game, policy, &game.initial_state())
}

fn expected_returns_from<G: Game>(
    game: &G,
    policy: &dyn Policy<G>,
    state: &G::State,
) -> Result<Vec<f64>, SolverError> {
    if game.is_terminal(state) {
        return terminal_returns(game, state);
    }

    let branches: Vec<(G::Action, f64)> = if game.is_chance(state) {
        game.chance_outcomes(state)
    } else {
        let actions = legal_actions(game, state)?;
        let probs = aligned_probabilities(game, policy, state, actions.len())?;
        actions.into_iter().zip(probs).collect()
    };

    let mut values = vec![0.0; game.num_players()];
    for (action, prob) in branches {
        if prob == 0.0 {
            continue;
        }
        let child = expected_returns_from(game, policy, &game.apply_action(state, &action))?;
        for (v, c) in values.iter_mut().zip(child) {
            *v += prob * c;
        }
    }
    Ok(values)
}

/// Value `player` obtains by best-responding to `policy` in the other seats.
pub fn best_response_value<G: Game>(
    game: &G,
    policy: &dyn Policy<G>,
    player: usize,
) -> Result<f64, SolverError> {
    let mut responder = BestResponder::new(game, policy, player);
    let root = game.initial_state();
    responder.collect(&root, 1.0)?;
    responder.value(&root)
}

/// Query `policy` at `state`, rejecting a distribution of the wrong length.
fn aligned_probabilities<G: Game>(
    game: &G,
    policy: &dyn Policy<G>,
    state: &G::State,
    num_actions: usize,
) -> Result<Vec<f64>, SolverError> {
    let probs = policy.action_probabilities(game, state)?;
    if probs.len() != num_actions {
        return Err(SolverError::ActionCountMismatch {
            key: game.info_state(state).key(),
            expected: num_actions,
            found: probs.len(),
        });
    }
    Ok(probs)
}

struct BestResponder<'a, G: Game> {
    game: &'a G,
    policy: &'a dyn Policy<G>,
    player: usize,
    /// Histories of each responder information state with their reach.
    infosets: FxHashMap<String, Vec<(G::State, f64)>>,
    best_actions: FxHashMap<String, usize>,
}

impl<'a, G: Game> BestResponder<'a, G> {
    fn new(game: &'a G, policy: &'a dyn Policy<G>, player: usize) -> Self {
        Self {
            game,
            policy,
            player,
            infosets: FxHashMap::default(),
            best_actions: FxHashMap::default(),
        }
    }

    /// Record every responder history together with its opponent/chance reach.
    fn collect(&mut self, state: &G::State, reach: f64) -> Result<(), SolverError> {
        let game = self.game;
        if game.is_terminal(state) {
            return Ok(());
        }

        if game.is_chance(state) {
            let outcomes = game.chance_outcomes(state);
            let probs: Vec<f64> = outcomes.iter().map(|(_, p)| *p).collect();
            validate_distribution("chance outcomes", &probs)?;
            for (outcome, prob) in outcomes {
                self.collect(&game.apply_action(state, &outcome), reach * prob)?;
            }
            return Ok(());
        }

        let current = acting_player(game, state)?;
        let actions = legal_actions(game, state)?;
        if current == self.player {
            let key = game.info_state(state).key();
            self.infosets
                .entry(key)
                .or_default()
                .push((state.clone(), reach));
            for action in &actions {
                self.collect(&game.apply_action(state, action), reach)?;
            }
        } else {
            let probs = aligned_probabilities(game, self.policy, state, actions.len())?;
            for (action, prob) in actions.iter().zip(probs) {
                self.collect(&game.apply_action(state, action), reach * prob)?;
            }
        }
        Ok(())
    }

    fn value(&mut self, state: &G::State) -> Result<f64, SolverError> {
        let game = self.game;
        if game.is_terminal(state) {
            return Ok(terminal_returns(game, state)?[self.player]);
        }

        if game.is_chance(state) {
            let mut value = 0.0;
            for (outcome, prob) in game.chance_outcomes(state) {
                value += prob * self.value(&game.apply_action(state, &outcome))?;
            }
            return Ok(value);
        }

        let current = acting_player(game, state)?;
        let actions = legal_actions(game, state)?;
        if current == self.player {
            let key = game.info_state(state).key();
            let best = self.best_action(&key)?;
            return self.value(&game.apply_action(state, &actions[best]));
        }

        let probs = aligned_probabilities(game, self.policy, state, actions.len())?;
        let mut value = 0.0;
        for (action, prob) in actions.iter().zip(probs) {
            if prob > 0.0 {
                value += prob * self.value(&game.apply_action(state, action))?;
            }
        }
        Ok(value)
    }

    /// Index of the responder's best action at information state `key`.
    fn best_action(&mut self, key: &str) -> Result<usize, SolverError> {
        if let Some(&best) = self.best_actions.get(key) {
            return Ok(best);
        }

        let histories = self
            .infosets
            .get(key)
            .cloned()
            .ok_or_else(|| SolverError::MissingInfoState(key.to_string()))?;
        let num_actions = match histories.first() {
            Some((state, _)) => legal_actions(self.game, state)?.len(),
            None => return Err(SolverError::MissingInfoState(key.to_string())),
        };

        let mut action_values = vec![0.0; num_actions];
        for (state, reach) in &histories {
            let actions = legal_actions(self.game, state)?;
            for (i, action) in actions.iter().enumerate() {
                action_values[i] += reach * self.value(&self.game.apply_action(state, action))?;
            }
        }

        let best = action_values
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > action_values[best] { i } else { best });
        self.best_actions.insert(key.to_string(), best);
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;
    use crate::cfr::policy::TabularPolicy;
    use crate::cfr::{CFRConfig, CFRSolver};
    use crate::games::kuhn::{KuhnAction, KuhnPoker};

    /// The alpha = 0 Kuhn equilibrium.
    fn kuhn_equilibrium() -> TabularPolicy<KuhnAction> {
        let mut table = FxHashMap::default();
        let entries: [(&str, [f64; 2]); 12] = [
            ("0:", [1.0, 0.0]),
            ("1:", [1.0, 0.0]),
            ("2:", [1.0, 0.0]),
            ("0:pb", [1.0, 0.0]),
            ("1:pb", [2.0 / 3.0, 1.0 / 3.0]),
            ("2:pb", [0.0, 1.0]),
            ("0:p", [2.0 / 3.0, 1.0 / 3.0]),
            ("1:p", [1.0, 0.0]),
            ("2:p", [0.0, 1.0]),
            ("0:b", [1.0, 0.0]),
            ("1:b", [2.0 / 3.0, 1.0 / 3.0]),
            ("2:b", [0.0, 1.0]),
        ];
        for (key, probs) in entries {
            table.insert(key.to_string(), probs.to_vec());
        }
        TabularPolicy::new(table)
    }

    #[test]
    fn test_equilibrium_has_zero_exploitability() {
        let game = KuhnPoker::new();
        let policy = kuhn_equilibrium();
        let value = BestResponseOracle::new().exploitability(&game, &policy).unwrap();
        assert!(value < 1e-9, "equilibrium exploitability {}", value);
    }

    #[test]
    fn test_equilibrium_game_value() {
        let game = KuhnPoker::new();
        let returns = expected_returns(&game, &kuhn_equilibrium()).unwrap();
        assert!((returns[0] - KuhnPoker::FIRST_PLAYER_VALUE).abs() < 1e-9);
        assert!((returns[0] + returns[1]).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_policy_is_exploitable() {
        let game = KuhnPoker::new();
        let uniform = TabularPolicy::uniform(&game).unwrap();
        let value = BestResponseOracle::new().exploitability(&game, &uniform).unwrap();
        // Known NashConv of the uniform Kuhn policy is 11/12
        assert!((value - 11.0 / 24.0).abs() < 1e-9, "uniform exploitability {}", value);
    }

    #[test]
    fn test_cfr_plus_drives_exploitability_down() {
        let game = KuhnPoker::new();
        let oracle = BestResponseOracle::new();
        let mut solver = CFRSolver::new(game.clone(), CFRConfig::default()).unwrap();

        solver.train(10).unwrap();
        let early = oracle.exploitability(&game, &solver.average_policy()).unwrap();
        solver.train(490).unwrap();
        let late = oracle.exploitability(&game, &solver.average_policy()).unwrap();

        assert!(late < early, "exploitability {} should fall below {}", late, early);
        assert!(late < 5e-3, "exploitability after 500 iterations {}", late);
    }

    #[test]
    fn test_missing_entry_propagates() {
        let game = KuhnPoker::new();
        let mut partial = kuhn_equilibrium().table().clone();
        partial.remove("2:b");
        let result = BestResponseOracle::new().exploitability(&game, &TabularPolicy::new(partial));
        assert!(matches!(result, Err(SolverError::MissingInfoState(_))));
    }

    /// Always answers with a single probability, whatever the legal actions.
    struct OneActionPolicy;

    impl Policy<KuhnPoker> for OneActionPolicy {
        fn action_probabilities(
            &self,
            _game: &KuhnPoker,
            _state: &<KuhnPoker as Game>::State,
        ) -> Result<Vec<f64>, SolverError> {
            Ok(vec![1.0])
        }
    }

    #[test]
    fn test_short_distribution_is_rejected() {
        let game = KuhnPoker::new();
        let expected = |result: Result<f64, SolverError>| {
            matches!(
                result,
                Err(SolverError::ActionCountMismatch { expected: 2, found: 1, .. })
            )
        };

        assert!(expected(best_response_value(&game, &OneActionPolicy, 0)));
        assert!(expected(best_response_value(&game, &OneActionPolicy, 1)));
        assert!(expected(BestResponseOracle::new().exploitability(&game, &OneActionPolicy)));
        assert!(matches!(
            expected_returns(&game, &OneActionPolicy),
            Err(SolverError::ActionCountMismatch { expected: 2, found: 1, .. })
        ));
    }
}
