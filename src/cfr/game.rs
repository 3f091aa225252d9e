//! Game trait definition for the CFR solver.
//!
//! Any two-player zero-sum game that implements the `Game` trait can be solved
//! with the regret-matching+ solver and played through the self-play engine.
//! This provides a clean abstraction between the algorithms and specific games.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::cfr::error::SolverError;

/// Maximum allowed deviation of a probability distribution's sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Trait for actions that can be taken in a game.
///
/// Chance outcomes are actions too: a chance node lists the actions it can
/// "take" together with their probabilities.
pub trait Action: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Short name of the action for display and storage.
    fn name(&self) -> String;
}

/// Trait for information states (what a player knows at a decision point).
///
/// Two game states that look identical to the acting player (same private
/// cards, same public history) must produce the same information state.
pub trait InfoState: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Unique string key for this information state.
    ///
    /// This key is used for storing regrets and strategies.
    fn key(&self) -> String;
}

/// Trait for game states.
///
/// A game state contains all information about the current state of the game,
/// including private information that players may not see.
pub trait GameState: Clone + Debug + Send + Sync + 'static {}

/// The main Game trait that defines the interface for any game.
///
/// # Type Parameters
/// - `State`: The game state type
/// - `Action`: The action type (player actions and chance outcomes)
/// - `InfoState`: The information state type
///
/// # Example
/// ```ignore
/// struct MyGame;
///
/// impl Game for MyGame {
///     type State = MyGameState;
///     type Action = MyAction;
///     type InfoState = MyInfoState;
///
///     // ... implement required methods
/// }
/// ```
pub trait Game: Clone + Send + Sync + 'static {
    /// The type representing a complete game state.
    type State: GameState;

    /// The type representing an action or chance outcome.
    type Action: Action;

    /// The type representing what a player knows at a decision point.
    type InfoState: InfoState;

    /// Create the initial game state.
    fn initial_state(&self) -> Self::State;

    /// Check if the given state is terminal (game over).
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Terminal returns, one entry per player.
    ///
    /// Only meaningful for terminal states.
    fn returns(&self, state: &Self::State) -> Vec<f64>;

    /// Index of the player to act.
    ///
    /// # Returns
    /// - `Some(player_index)` if a player should act
    /// - `None` if the state is terminal or a chance node
    fn current_player(&self, state: &Self::State) -> Option<usize>;

    /// Get the total number of players in the game.
    fn num_players(&self) -> usize;

    /// Legal actions for the acting player.
    ///
    /// Well defined only for non-terminal, non-chance states.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Apply an action (or chance outcome) and return the resulting new state.
    ///
    /// This should not modify the input state.
    fn apply_action(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    /// Information state of the player who is currently acting.
    fn info_state(&self, state: &Self::State) -> Self::InfoState;

    /// Check if the current state is a chance node.
    fn is_chance(&self, _state: &Self::State) -> bool {
        false
    }

    /// Chance outcomes with their probabilities at a chance node.
    ///
    /// The probabilities must sum to 1.
    fn chance_outcomes(&self, _state: &Self::State) -> Vec<(Self::Action, f64)> {
        Vec::new()
    }

    /// Get a human-readable name for an action.
    fn action_name(&self, action: &Self::Action) -> String {
        action.name()
    }

    /// Get a human-readable description of a state.
    fn state_description(&self, state: &Self::State) -> String {
        format!("{:?}", state)
    }
}

/// A decision point discovered while walking the full game tree.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoStateDescriptor {
    /// Information state key.
    pub key: String,
    /// Player acting at this information state.
    pub player: usize,
    /// Names of the legal actions, in legal-action order.
    pub action_names: Vec<String>,
}

/// Walk the full game tree and collect every decision information state.
///
/// Each information state is reported once, in the order it is first reached
/// by a depth-first walk that expands chance outcomes in declared order.
pub fn enumerate_info_states<G: Game>(game: &G) -> Result<Vec<InfoStateDescriptor>, SolverError> {
    let mut seen = FxHashSet::default();
    let mut found = Vec::new();
    collect_info_states(game, &game.initial_state(), &mut seen, &mut found)?;
    Ok(found)
}

fn collect_info_states<G: Game>(
    game: &G,
    state: &G::State,
    seen: &mut FxHashSet<String>,
    found: &mut Vec<InfoStateDescriptor>,
) -> Result<(), SolverError> {
    if game.is_terminal(state) {
        return Ok(());
    }

    if game.is_chance(state) {
        for (outcome, _) in game.chance_outcomes(state) {
            let child = game.apply_action(state, &outcome);
            collect_info_states(game, &child, seen, found)?;
        }
        return Ok(());
    }

    let player = acting_player(game, state)?;
    let actions = legal_actions(game, state)?;
    let key = game.info_state(state).key();

    if seen.insert(key.clone()) {
        found.push(InfoStateDescriptor {
            key,
            player,
            action_names: actions.iter().map(|a| game.action_name(a)).collect(),
        });
    }

    for action in &actions {
        let child = game.apply_action(state, action);
        collect_info_states(game, &child, seen, found)?;
    }
    Ok(())
}

/// Acting player at a decision node, or an error if the engine reports none.
pub(crate) fn acting_player<G: Game>(game: &G, state: &G::State) -> Result<usize, SolverError> {
    game.current_player(state).ok_or_else(|| {
        SolverError::InvalidState(format!(
            "no acting player at non-terminal state {}",
            game.state_description(state)
        ))
    })
}

/// Legal actions at a decision node, or an error if there are none.
pub(crate) fn legal_actions<G: Game>(
    game: &G,
    state: &G::State,
) -> Result<Vec<G::Action>, SolverError> {
    let actions = game.legal_actions(state);
    if actions.is_empty() {
        return Err(SolverError::InvalidState(format!(
            "no legal actions at non-terminal state {}",
            game.state_description(state)
        )));
    }
    Ok(actions)
}

/// Terminal returns, checked to carry one entry per player.
pub(crate) fn terminal_returns<G: Game>(game: &G, state: &G::State) -> Result<Vec<f64>, SolverError> {
    let returns = game.returns(state);
    if returns.len() != game.num_players() {
        return Err(SolverError::InvalidState(format!(
            "terminal state {} returned {} values for {} players",
            game.state_description(state),
            returns.len(),
            game.num_players()
        )));
    }
    Ok(returns)
}

/// Check that `probs` is a probability distribution.
///
/// Every entry must be finite and non-negative, and the entries must sum to 1
/// within [`PROBABILITY_TOLERANCE`]. Nothing is renormalized.
pub fn validate_distribution(context: &str, probs: &[f64]) -> Result<(), SolverError> {
    let sum: f64 = probs.iter().sum();
    let well_formed = probs.iter().all(|&p| p.is_finite() && p >= 0.0);

    if !well_formed || (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SolverError::InvalidDistribution {
            context: context.to_string(),
            sum,
        });
    }
    Ok(())
}

/// Macro to simplify implementing the Action trait for simple enums.
#[macro_export]
macro_rules! impl_action {
    ($type:ty) => {
        impl $crate::cfr::game::Action for $type {
            fn name(&self) -> String {
                format!("{:?}", self)
            }
        }
    };
}

/// Macro to simplify implementing the GameState trait.
#[macro_export]
macro_rules! impl_game_state {
    ($type:ty) => {
        impl $crate::cfr::game::GameState for $type {}
    };
}
