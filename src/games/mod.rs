//! Game implementations for the CFR solver.
//!
//! Games with known Nash equilibria (like Kuhn Poker) validate the solver and
//! the self-play engine, and show how to implement the `Game` trait.
//!
//! ## Available Games
//!
//! - [`kuhn`]: Kuhn Poker - A simplified 3-card poker game with known Nash equilibrium
//!
//! ## Adding New Games
//!
//! 1. Create a new module under `src/games/`
//! 2. Define state, action, and info state types
//! 3. Implement the `Game` trait, listing chance outcomes explicitly
//! 4. Add tests that verify expected behavior

pub mod kuhn;
