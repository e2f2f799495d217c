//! Game rules interface.
//!
//! The engine never looks inside a state. Everything it needs to know about
//! a game goes through the [`Game`] trait.

use std::fmt::Debug;

use crate::constants::{DRAW_VALUE, LOSS_VALUE, WIN_VALUE};

/// Result query for a game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<P> {
    /// The game continues.
    Ongoing,
    /// The game is over and `P` won.
    Winner(P),
    /// The game is over without a winner.
    Draw,
}

impl<P: PartialEq> Outcome<P> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }

    /// Value of a finished game from `player`'s point of view.
    ///
    /// An unfinished game scores as a draw.
    pub fn value_for(&self, player: &P) -> f64 {
        match self {
            Outcome::Winner(winner) if winner == player => WIN_VALUE,
            Outcome::Winner(_) => LOSS_VALUE,
            Outcome::Draw | Outcome::Ongoing => DRAW_VALUE,
        }
    }
}

/// Rules of a two-player, alternating-move game with a fixed action space.
///
/// Implementations must be shareable across search workers, hence the
/// `Send + Sync` bounds.
pub trait Game: Send + Sync {
    /// Immutable position value.
    type State: Clone + PartialEq + Debug + Send + Sync;

    /// Identity of a player.
    type Player: Copy + Eq + Debug + Send + Sync;

    /// Size of the action space. Every mask and prior vector has this length.
    fn action_count(&self) -> usize;

    /// The player with the right to move in `state`.
    fn player_to_move(&self, state: &Self::State) -> Self::Player;

    /// Apply `action` to `state`. Returns `None` if the action cannot be
    /// applied.
    fn apply_action(&self, state: &Self::State, action: usize) -> Option<Self::State>;

    /// Legal action mask, `action_count()` entries long.
    fn legal_actions(&self, state: &Self::State) -> Vec<bool>;

    /// Whether `state` is finished and who won. `last_action` is the action
    /// that produced `state`, when known, so implementations may restrict
    /// their check to it.
    fn winner(&self, state: &Self::State, last_action: Option<usize>) -> Outcome<Self::Player>;
}
