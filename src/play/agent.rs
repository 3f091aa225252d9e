//! Agents: a policy bound to a human-readable description.

use std::sync::Arc;

use rand::Rng;

use crate::cfr::error::SolverError;
use crate::cfr::exploitability::ExploitabilityOracle;
use crate::cfr::game::{legal_actions, validate_distribution, Game, InfoState};
use crate::cfr::policy::{Policy, SharedPolicy};

/// A player in self-play.
///
/// The agent holds a shared handle to its policy and nothing else; training
/// changes what the agent plays by swapping the handle.
#[derive(Clone)]
pub struct Agent<G: Game> {
    policy: SharedPolicy<G>,
    description: String,
}

impl<G: Game> Agent<G> {
    /// Bind a shared policy.
    pub fn new(policy: SharedPolicy<G>, description: impl Into<String>) -> Self {
        Self {
            policy,
            description: description.into(),
        }
    }

    /// Bind an owned policy.
    pub fn from_policy<P>(policy: P, description: impl Into<String>) -> Self
    where
        P: Policy<G> + Send + Sync + 'static,
    {
        Self::new(Arc::new(policy), description)
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The bound policy.
    pub fn policy(&self) -> &SharedPolicy<G> {
        &self.policy
    }

    /// Bind a different policy and return the previous one.
    pub fn replace_policy(&mut self, policy: SharedPolicy<G>) -> SharedPolicy<G> {
        std::mem::replace(&mut self.policy, policy)
    }

    /// Sample an action at `state` from the bound policy.
    pub fn choose_action<R: Rng>(
        &self,
        game: &G,
        state: &G::State,
        rng: &mut R,
    ) -> Result<G::Action, SolverError> {
        let mut actions = legal_actions(game, state)?;
        let probs = self.policy.action_probabilities(game, state)?;

        if probs.len() != actions.len() {
            return Err(SolverError::ActionCountMismatch {
                key: game.info_state(state).key(),
                expected: actions.len(),
                found: probs.len(),
            });
        }
        validate_distribution(&format!("policy of {}", self.description), &probs)?;

        let index = sample_index(&probs, rng);
        Ok(actions.swap_remove(index))
    }

    /// Exploitability of the bound policy.
    pub fn exploitability(
        &self,
        game: &G,
        oracle: &dyn ExploitabilityOracle<G>,
    ) -> Result<f64, SolverError> {
        oracle.exploitability(game, self.policy.as_ref())
    }
}

impl<G: Game> std::fmt::Debug for Agent<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").field("description", &self.description).finish()
    }
}

/// Sample an index according to a probability distribution.
pub fn sample_index<R: Rng>(probs: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.gen();
    let mut cumsum = 0.0;

    for (i, &prob) in probs.iter().enumerate() {
        cumsum += prob;
        if r < cumsum {
            return i;
        }
    }

    // Floating point shortfall: last action with positive probability
    probs.iter().rposition(|&p| p > 0.0).unwrap_or(probs.len() - 1)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cfr::exploitability::BestResponseOracle;
    use crate::cfr::policy::TabularPolicy;
    use crate::games::kuhn::{KuhnAction, KuhnPoker, KuhnState};

    fn opening() -> KuhnState {
        KuhnState {
            cards: [1, 2],
            dealt: 2,
            history: String::new(),
            pot: [1, 1],
        }
    }

    #[test]
    fn test_sample_index_respects_zero_probability() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert_eq!(sample_index(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
    }

    #[test]
    fn test_sample_index_frequencies() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = [0usize; 2];
        for _ in 0..20_000 {
            counts[sample_index(&[0.25, 0.75], &mut rng)] += 1;
        }
        let freq = counts[1] as f64 / 20_000.0;
        assert!((freq - 0.75).abs() < 0.02, "frequency {}", freq);
    }

    #[test]
    fn test_choose_action_follows_pure_policy() {
        let game = KuhnPoker::new();
        let mut policy = TabularPolicy::uniform(&game).unwrap();
        policy.insert("1:", vec![0.0, 1.0]);
        let agent = Agent::from_policy(policy, "always bet with queen");

        let mut rng = StdRng::seed_from_u64(3);
        let action = agent.choose_action(&game, &opening(), &mut rng).unwrap();
        assert_eq!(action, KuhnAction::Bet);
    }

    #[test]
    fn test_replace_policy_swaps_and_returns_previous() {
        let game = KuhnPoker::new();
        let uniform = TabularPolicy::uniform(&game).unwrap();
        let mut pass_first = uniform.clone();
        pass_first.insert("1:", vec![1.0, 0.0]);

        let mut agent = Agent::from_policy(uniform, "learner");
        let previous = agent.replace_policy(Arc::new(pass_first));

        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(agent.choose_action(&game, &opening(), &mut rng).unwrap(), KuhnAction::Pass);
        assert_eq!(previous.action_probabilities(&game, &opening()).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_agent_exploitability_uses_bound_policy() {
        let game = KuhnPoker::new();
        let agent = Agent::from_policy(TabularPolicy::uniform(&game).unwrap(), "uniform");
        let value = agent.exploitability(&game, &BestResponseOracle::new()).unwrap();
        assert!(value > 0.4);
    }
}
