//! Kuhn Poker implementation for CFR validation.
//!
//! Kuhn Poker is a simplified poker game used to validate CFR implementations
//! because it has a known, mathematically proven Nash equilibrium.
//!
//! ## Game Rules
//!
//! - 3 cards: Jack (0), Queen (1), King (2)
//! - 2 players, each antes 1 chip
//! - Chance deals one card to each player (two chance nodes)
//! - Player 1 acts first: Pass or Bet (1 chip)
//! - Player 2 responds based on P1's action
//! - Higher card wins at showdown
//!
//! ## Game Tree
//!
//! ```text
//! Deal P1 (1/3 each) -> Deal P2 (1/2 each)
//! P1 (first to act)
//! ├── Pass
//! │   └── P2
//! │       ├── Pass → Showdown (pot = 2)
//! │       └── Bet
//! │           └── P1
//! │               ├── Pass → P2 wins (pot = 3)
//! │               └── Bet → Showdown (pot = 4)
//! └── Bet
//!     └── P2
//!         ├── Pass → P1 wins (pot = 3)
//!         └── Bet → Showdown (pot = 4)
//! ```
//!
//! ## Known Nash Equilibrium
//!
//! - **Player 1 with Jack**: Bet with probability α ∈ [0, 1/3]
//! - **Player 1 with Queen**: Always Pass
//! - **Player 1 with King**: Bet with probability 3α
//! - **Player 2 facing Bet with Jack**: Always Fold
//! - **Player 2 facing Bet with Queen**: Call with probability 1/3
//! - **Player 2 facing Bet with King**: Always Call
//!
//! **Expected Value**: Player 1 EV = -1/18 ≈ -0.0556

use std::fmt;

use crate::cfr::game::{Action, Game, GameState, InfoState};

/// Number of cards in the deck.
pub const NUM_CARDS: u8 = 3;

/// Actions in Kuhn Poker, including the chance deals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KuhnAction {
    /// Pass (check if no bet, fold if facing bet)
    Pass,
    /// Bet (or call if facing bet)
    Bet,
    /// Chance outcome: deal this card to the next player
    Deal(u8),
}

impl KuhnAction {
    /// Player action at position `index` of the legal-action list.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(KuhnAction::Pass),
            1 => Some(KuhnAction::Bet),
            _ => None,
        }
    }
}

impl Action for KuhnAction {
    fn name(&self) -> String {
        match self {
            KuhnAction::Pass => "p".to_string(),
            KuhnAction::Bet => "b".to_string(),
            KuhnAction::Deal(card) => format!("d{}", card),
        }
    }
}

impl fmt::Display for KuhnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KuhnAction::Pass => write!(f, "Pass"),
            KuhnAction::Bet => write!(f, "Bet"),
            KuhnAction::Deal(card) => write!(f, "Deal {}", KuhnPoker::card_name(*card)),
        }
    }
}

/// Information state in Kuhn Poker.
///
/// What a player knows: their card and the action history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KuhnInfoState {
    /// Player's card (0=Jack, 1=Queen, 2=King)
    pub card: u8,
    /// Action history as string (e.g., "pb" = pass then bet)
    pub history: String,
}

impl InfoState for KuhnInfoState {
    fn key(&self) -> String {
        format!("{}:{}", self.card, self.history)
    }
}

impl fmt::Display for KuhnInfoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", card_letter(self.card), self.history)
    }
}

/// Complete game state in Kuhn Poker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KuhnState {
    /// Cards dealt so far; `cards[i]` is meaningful once `dealt > i`
    pub cards: [u8; 2],
    /// Number of cards dealt (0, 1 or 2)
    pub dealt: u8,
    /// Action history as string
    pub history: String,
    /// Amount each player has invested in the pot
    pub pot: [i32; 2],
}

impl GameState for KuhnState {}

impl Default for KuhnState {
    fn default() -> Self {
        Self {
            cards: [0, 0],
            dealt: 0,
            history: String::new(),
            pot: [1, 1], // Both ante 1
        }
    }
}

impl fmt::Display for KuhnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<&str> = (0..2)
            .map(|i| if (i as u8) < self.dealt { card_letter(self.cards[i]) } else { "?" })
            .collect();
        write!(
            f,
            "P1:{} P2:{} History:{} Pot:{:?}",
            shown[0], shown[1], self.history, self.pot
        )
    }
}

fn card_letter(card: u8) -> &'static str {
    match card {
        0 => "J",
        1 => "Q",
        2 => "K",
        _ => "?",
    }
}

/// Kuhn Poker game.
#[derive(Debug, Clone, Default)]
pub struct KuhnPoker;

impl KuhnPoker {
    /// Create a new Kuhn Poker game.
    pub fn new() -> Self {
        Self
    }

    /// Get card name for display.
    pub fn card_name(card: u8) -> &'static str {
        match card {
            0 => "Jack",
            1 => "Queen",
            2 => "King",
            _ => "Unknown",
        }
    }

    /// Game value for the first player under equilibrium play.
    pub const FIRST_PLAYER_VALUE: f64 = -1.0 / 18.0;
}

impl Game for KuhnPoker {
    type State = KuhnState;
    type Action = KuhnAction;
    type InfoState = KuhnInfoState;

    fn initial_state(&self) -> Self::State {
        KuhnState::default()
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        // "pp" showdown, "pbp" fold, "pbb" call, "bp" fold, "bb" call
        matches!(state.history.as_str(), "pp" | "pbp" | "pbb" | "bp" | "bb")
    }

    fn returns(&self, state: &Self::State) -> Vec<f64> {
        debug_assert!(self.is_terminal(state), "returns called on non-terminal state");

        let p0_wins_showdown = state.cards[0] > state.cards[1];
        let p0_payoff: f64 = match state.history.as_str() {
            // Showdown after both pass - pot is 2 (1+1 ante)
            "pp" => if p0_wins_showdown { 1.0 } else { -1.0 },
            // Player 2 folded to a bet
            "bp" => 1.0,
            // Player 1 folded to a bet
            "pbp" => -1.0,
            // Showdown after bet-call - pot is 4 (2+2)
            "bb" | "pbb" => if p0_wins_showdown { 2.0 } else { -2.0 },
            _ => 0.0,
        };

        vec![p0_payoff, -p0_payoff]
    }

    fn current_player(&self, state: &Self::State) -> Option<usize> {
        if self.is_terminal(state) || self.is_chance(state) {
            return None;
        }

        // After "pb", P0 acts again
        match state.history.as_str() {
            "" => Some(0),
            "p" => Some(1),
            "b" => Some(1),
            "pb" => Some(0),
            _ => None,
        }
    }

    fn num_players(&self) -> usize {
        2
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action> {
        if self.is_terminal(state) || self.is_chance(state) {
            return vec![];
        }
        vec![KuhnAction::Pass, KuhnAction::Bet]
    }

    fn apply_action(&self, state: &Self::State, action: &Self::Action) -> Self::State {
        let mut new_state = state.clone();

        match action {
            KuhnAction::Deal(card) => {
                new_state.cards[new_state.dealt as usize] = *card;
                new_state.dealt += 1;
            }
            KuhnAction::Pass => {
                new_state.history.push('p');
            }
            KuhnAction::Bet => {
                if let Some(player) = self.current_player(state) {
                    new_state.pot[player] += 1;
                }
                new_state.history.push('b');
            }
        }

        new_state
    }

    fn info_state(&self, state: &Self::State) -> Self::InfoState {
        let player = self.current_player(state).unwrap_or(0);
        KuhnInfoState {
            card: state.cards[player],
            history: state.history.clone(),
        }
    }

    fn is_chance(&self, state: &Self::State) -> bool {
        state.dealt < 2
    }

    fn chance_outcomes(&self, state: &Self::State) -> Vec<(Self::Action, f64)> {
        let remaining: Vec<u8> = (0..NUM_CARDS)
            .filter(|c| !state.cards[..state.dealt as usize].contains(c))
            .collect();
        let prob = 1.0 / remaining.len() as f64;
        remaining.into_iter().map(|c| (KuhnAction::Deal(c), prob)).collect()
    }

    fn action_name(&self, action: &Self::Action) -> String {
        action.to_string()
    }

    fn state_description(&self, state: &Self::State) -> String {
        format!("{}", state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::game::validate_distribution;

    fn dealt(cards: [u8; 2], history: &str) -> KuhnState {
        KuhnState {
            cards,
            dealt: 2,
            history: history.to_string(),
            pot: [1, 1],
        }
    }

    #[test]
    fn test_kuhn_chance_nodes() {
        let game = KuhnPoker::new();
        let state = game.initial_state();
        assert!(game.is_chance(&state));
        assert_eq!(game.current_player(&state), None);

        let outcomes = game.chance_outcomes(&state);
        assert_eq!(outcomes.len(), 3);
        let probs: Vec<f64> = outcomes.iter().map(|(_, p)| *p).collect();
        assert!(validate_distribution("deal", &probs).is_ok());

        let after_first = game.apply_action(&state, &KuhnAction::Deal(2));
        assert!(game.is_chance(&after_first));
        let second = game.chance_outcomes(&after_first);
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|(a, p)| *a != KuhnAction::Deal(2) && *p == 0.5));

        let ready = game.apply_action(&after_first, &KuhnAction::Deal(0));
        assert!(!game.is_chance(&ready));
        assert_eq!(ready.cards, [2, 0]);
        assert_eq!(game.current_player(&ready), Some(0));
    }

    #[test]
    fn test_kuhn_game_tree() {
        let game = KuhnPoker::new();
        let state = dealt([2, 0], "");
        assert!(!game.is_terminal(&state));

        let actions = game.legal_actions(&state);
        assert_eq!(actions, vec![KuhnAction::Pass, KuhnAction::Bet]);

        let after_bet = game.apply_action(&state, &KuhnAction::Bet);
        assert_eq!(after_bet.pot, [2, 1]);
        assert_eq!(game.current_player(&after_bet), Some(1));
    }

    #[test]
    fn test_kuhn_terminal_returns() {
        let game = KuhnPoker::new();

        // K vs J, both pass
        assert_eq!(game.returns(&dealt([2, 0], "pp")), vec![1.0, -1.0]);
        // J bets, K folds
        assert_eq!(game.returns(&dealt([0, 2], "bp")), vec![1.0, -1.0]);
        // J vs K, bet and call
        assert_eq!(game.returns(&dealt([0, 2], "bb")), vec![-2.0, 2.0]);
        // P1 folds after pass-bet
        assert_eq!(game.returns(&dealt([2, 1], "pbp")), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_kuhn_info_states() {
        let game = KuhnPoker::new();
        let state = dealt([1, 2], "p");

        assert_eq!(game.current_player(&state), Some(1));
        let info = game.info_state(&state);
        assert_eq!(info.card, 2);
        assert_eq!(info.key(), "2:p");
    }

    #[test]
    fn test_action_index_matches_legal_order() {
        let game = KuhnPoker::new();
        let actions = game.legal_actions(&dealt([0, 1], ""));
        assert_eq!(KuhnAction::from_index(0), Some(actions[0]));
        assert_eq!(KuhnAction::from_index(1), Some(actions[1]));
        assert_eq!(KuhnAction::from_index(2), None);
    }
}
