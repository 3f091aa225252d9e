//! Policies: maps from information states to action distributions.
//!
//! A [`TabularPolicy`] is a snapshot of a strategy (current or average) or a
//! strategy loaded from disk. It can carry an [`ActionSelectionBias`], a lens
//! applied at query time that never touches the stored table.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cfr::error::{PersistenceError, SolverError};
use crate::cfr::game::{enumerate_info_states, Action, Game, InfoState};
use crate::cfr::storage::uniform;

/// Anything that yields a distribution over the legal actions of a state.
pub trait Policy<G: Game> {
    /// Probability of each legal action at `state`, in legal-action order.
    fn action_probabilities(&self, game: &G, state: &G::State) -> Result<Vec<f64>, SolverError>;
}

/// Shared, thread-safe policy handle.
pub type SharedPolicy<G> = Arc<dyn Policy<G> + Send + Sync>;

/// Multiplicative bias on one action, applied when a policy is queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSelectionBias<A> {
    /// Action whose probability is scaled.
    pub action: A,
    /// Multiplier applied before renormalizing.
    pub weight: f64,
}

impl<A: Action> ActionSelectionBias<A> {
    /// Create a bias, rejecting negative or non-finite weights.
    pub fn new(action: A, weight: f64) -> Result<Self, SolverError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SolverError::InvalidBias(weight));
        }
        Ok(Self { action, weight })
    }

    /// Apply the bias to `probs`, aligned with `legal_actions`.
    ///
    /// No-op if the action is illegal here, it is the only legal action, or
    /// `probs` is not aligned with `legal_actions`.
    pub fn apply(&self, legal_actions: &[A], probs: &mut [f64]) {
        if legal_actions.len() < 2 || probs.len() != legal_actions.len() {
            return;
        }
        let Some(index) = legal_actions.iter().position(|a| *a == self.action) else {
            return;
        };

        let biased = probs[index] * self.weight;
        let sum: f64 = probs.iter().sum::<f64>() - probs[index] + biased;
        if sum <= 0.0 {
            log::warn!(
                "bias {}x{} would empty the distribution, leaving it unbiased",
                self.action.name(),
                self.weight
            );
            return;
        }

        probs[index] = biased;
        for p in probs.iter_mut() {
            *p /= sum;
        }
    }
}

/// Table of distributions keyed by information state.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularPolicy<A> {
    table: FxHashMap<String, Vec<f64>>,
    bias: Option<ActionSelectionBias<A>>,
}

impl<A: Action> TabularPolicy<A> {
    /// Wrap an existing table without bias.
    pub fn new(table: FxHashMap<String, Vec<f64>>) -> Self {
        Self { table, bias: None }
    }

    /// Uniform policy over every information state of `game`.
    pub fn uniform<G: Game<Action = A>>(game: &G) -> Result<Self, SolverError> {
        let table = enumerate_info_states(game)?
            .into_iter()
            .map(|info| {
                let n = info.action_names.len();
                (info.key, uniform(n))
            })
            .collect();
        Ok(Self::new(table))
    }

    /// Builder method: attach a bias.
    pub fn with_bias(mut self, bias: ActionSelectionBias<A>) -> Self {
        self.bias = Some(bias);
        self
    }

    /// Replace the bias. Only between uses; queries read it without locking.
    pub fn set_bias(&mut self, bias: Option<ActionSelectionBias<A>>) {
        self.bias = bias;
    }

    /// Drop the bias, restoring the stored distributions.
    pub fn clear_bias(&mut self) {
        self.bias = None;
    }

    /// Current bias, if any.
    pub fn bias(&self) -> Option<&ActionSelectionBias<A>> {
        self.bias.as_ref()
    }

    /// Stored (unbiased) distribution at `key`.
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.table.get(key).map(Vec::as_slice)
    }

    /// Insert or overwrite the distribution at `key`.
    pub fn insert(&mut self, key: impl Into<String>, probs: Vec<f64>) {
        self.table.insert(key.into(), probs);
    }

    /// Underlying table.
    pub fn table(&self) -> &FxHashMap<String, Vec<f64>> {
        &self.table
    }

    /// Number of information states in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Write the table (without bias) as JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let export = PolicyExport {
            table: self.table.clone(),
        };
        let json = serde_json::to_string_pretty(&export)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a table written by [`TabularPolicy::save_json`]. The result is unbiased.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let content = fs::read_to_string(path)?;
        let export: PolicyExport = serde_json::from_str(&content)?;
        Ok(Self::new(export.table))
    }
}

impl<G: Game> Policy<G> for TabularPolicy<G::Action> {
    fn action_probabilities(&self, game: &G, state: &G::State) -> Result<Vec<f64>, SolverError> {
        let key = game.info_state(state).key();
        let stored = self
            .table
            .get(&key)
            .ok_or_else(|| SolverError::MissingInfoState(key.clone()))?;

        let legal_actions = game.legal_actions(state);
        if stored.len() != legal_actions.len() {
            return Err(SolverError::ActionCountMismatch {
                key,
                expected: legal_actions.len(),
                found: stored.len(),
            });
        }

        let mut probs = stored.clone();
        if let Some(bias) = &self.bias {
            bias.apply(&legal_actions, &mut probs);
        }
        Ok(probs)
    }
}

/// Serialized form of a tabular policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyExport {
    /// Distribution per information state.
    pub table: FxHashMap<String, Vec<f64>>,
}

/// Policy composed seat by seat: each acting player reads its own policy.
pub struct SeatwisePolicy<G: Game> {
    seats: Vec<SharedPolicy<G>>,
}

impl<G: Game> SeatwisePolicy<G> {
    /// One policy per player, indexed by seat.
    pub fn new(seats: Vec<SharedPolicy<G>>) -> Self {
        Self { seats }
    }
}

impl<G: Game> Policy<G> for SeatwisePolicy<G> {
    fn action_probabilities(&self, game: &G, state: &G::State) -> Result<Vec<f64>, SolverError> {
        let player = game.current_player(state).ok_or_else(|| {
            SolverError::InvalidState(format!(
                "policy queried without an acting player at {}",
                game.state_description(state)
            ))
        })?;
        let policy = self.seats.get(player).ok_or(SolverError::InvalidLearner(player))?;
        policy.action_probabilities(game, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::kuhn::{KuhnAction, KuhnPoker, KuhnState};

    fn state(cards: [u8; 2], history: &str) -> KuhnState {
        KuhnState {
            cards,
            dealt: 2,
            history: history.to_string(),
            pot: [1, 1],
        }
    }

    fn policy_with(key: &str, probs: Vec<f64>) -> TabularPolicy<KuhnAction> {
        let mut policy = TabularPolicy::new(FxHashMap::default());
        policy.insert(key, probs);
        policy
    }

    #[test]
    fn test_lookup_without_bias() {
        let game = KuhnPoker::new();
        let policy = policy_with("2:", vec![0.3, 0.7]);
        let probs = policy.action_probabilities(&game, &state([2, 0], "")).unwrap();
        assert_eq!(probs, vec![0.3, 0.7]);
    }

    #[test]
    fn test_missing_info_state_is_an_error() {
        let game = KuhnPoker::new();
        let policy = policy_with("2:", vec![0.3, 0.7]);
        let err = policy.action_probabilities(&game, &state([1, 0], "")).unwrap_err();
        assert_eq!(err, SolverError::MissingInfoState("1:".to_string()));
    }

    #[test]
    fn test_bias_increases_probability_and_renormalizes() {
        let game = KuhnPoker::new();
        let s = state([2, 0], "");
        let unbiased = policy_with("2:", vec![0.4, 0.6]);
        let biased = unbiased
            .clone()
            .with_bias(ActionSelectionBias::new(KuhnAction::Pass, 3.0).unwrap());

        let before = unbiased.action_probabilities(&game, &s).unwrap();
        let after = biased.action_probabilities(&game, &s).unwrap();

        assert!(after[0] > before[0]);
        assert!((after.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // 0.4*3 / (1.2 + 0.6)
        assert!((after[0] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_bias_never_mutates_table() {
        let game = KuhnPoker::new();
        let policy = policy_with("2:", vec![0.4, 0.6])
            .with_bias(ActionSelectionBias::new(KuhnAction::Bet, 5.0).unwrap());
        let _ = policy.action_probabilities(&game, &state([2, 0], "")).unwrap();
        assert_eq!(policy.get("2:").unwrap(), &[0.4, 0.6]);
    }

    #[test]
    fn test_bias_on_illegal_action_is_noop() {
        let legal = vec![KuhnAction::Pass, KuhnAction::Bet];
        let bias = ActionSelectionBias::new(KuhnAction::Deal(1), 4.0).unwrap();
        let mut probs = vec![0.2, 0.8];
        bias.apply(&legal, &mut probs);
        assert_eq!(probs, vec![0.2, 0.8]);
    }

    #[test]
    fn test_bias_with_single_legal_action_is_noop() {
        let bias = ActionSelectionBias::new(KuhnAction::Pass, 4.0).unwrap();
        let mut probs = vec![1.0];
        bias.apply(&[KuhnAction::Pass], &mut probs);
        assert_eq!(probs, vec![1.0]);
    }

    #[test]
    fn test_bias_on_misaligned_distribution_is_noop() {
        let bias = ActionSelectionBias::new(KuhnAction::Bet, 4.0).unwrap();
        let mut probs = vec![1.0];
        bias.apply(&[KuhnAction::Pass, KuhnAction::Bet], &mut probs);
        assert_eq!(probs, vec![1.0]);
    }

    #[test]
    fn test_bias_that_would_empty_distribution_is_skipped() {
        let bias = ActionSelectionBias::new(KuhnAction::Pass, 0.0).unwrap();
        let mut probs = vec![1.0, 0.0];
        bias.apply(&[KuhnAction::Pass, KuhnAction::Bet], &mut probs);
        assert_eq!(probs, vec![1.0, 0.0]);
    }

    #[test]
    fn test_invalid_bias_weight_rejected() {
        assert!(ActionSelectionBias::new(KuhnAction::Pass, -1.0).is_err());
        assert!(ActionSelectionBias::new(KuhnAction::Pass, f64::NAN).is_err());
    }

    #[test]
    fn test_uniform_covers_every_info_state() {
        let policy = TabularPolicy::uniform(&KuhnPoker::new()).unwrap();
        assert_eq!(policy.len(), 12);
        assert_eq!(policy.get("0:pb").unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn test_save_and_load_json() {
        let path = std::env::temp_dir().join("semistatic_cfr_policy_roundtrip.json");
        let policy = policy_with("1:b", vec![0.9, 0.1])
            .with_bias(ActionSelectionBias::new(KuhnAction::Bet, 2.0).unwrap());
        policy.save_json(&path).unwrap();

        let loaded: TabularPolicy<KuhnAction> = TabularPolicy::load_json(&path).unwrap();
        assert_eq!(loaded.get("1:b").unwrap(), &[0.9, 0.1]);
        assert!(loaded.bias().is_none(), "persistence stores the raw table only");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_seatwise_policy_dispatches_by_player() {
        let game = KuhnPoker::new();
        let first: SharedPolicy<KuhnPoker> = Arc::new(policy_with("2:", vec![1.0, 0.0]));
        let second: SharedPolicy<KuhnPoker> = Arc::new(policy_with("0:p", vec![0.0, 1.0]));
        let joint = SeatwisePolicy::new(vec![first, second]);

        assert_eq!(joint.action_probabilities(&game, &state([2, 0], "")).unwrap(), vec![1.0, 0.0]);
        assert_eq!(joint.action_probabilities(&game, &state([2, 0], "p")).unwrap(), vec![0.0, 1.0]);
    }
}
