//! Random playouts for leaf evaluation.
//!
//! Used when an [`Evaluator`](crate::evaluator::Evaluator) has no value
//! estimate of its own. A playout picks uniformly random legal actions until
//! the game ends.

use crate::game::{Game, Outcome};

/// Play uniformly random legal actions from `state` until the game ends.
///
/// `last_action` is the action that produced `state`, if known. A non-terminal
/// state without legal actions, or an action the game refuses to apply,
/// ends the playout as a draw.
pub fn rollout<G: Game>(
    game: &G,
    state: &G::State,
    last_action: Option<usize>,
    rng: &mut fastrand::Rng,
) -> Outcome<G::Player> {
    let mut state = state.clone();
    let mut last_action = last_action;
    let mut candidates = Vec::with_capacity(game.action_count());

    loop {
        let outcome = game.winner(&state, last_action);
        if outcome.is_terminal() {
            return outcome;
        }

        candidates.clear();
        candidates.extend(
            game.legal_actions(&state)
                .iter()
                .enumerate()
                .filter(|&(_, &legal)| legal)
                .map(|(action, _)| action),
        );
        if candidates.is_empty() {
            return Outcome::Draw;
        }

        let action = candidates[rng.usize(..candidates.len())];
        match game.apply_action(&state, action) {
            Some(next) => {
                state = next;
                last_action = Some(action);
            }
            None => return Outcome::Draw,
        }
    }
}
