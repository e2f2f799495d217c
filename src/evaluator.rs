//! Evaluator trait for position evaluation.
//!
//! The evaluator supplies the priors a node captures at creation and,
//! optionally, a value estimate for a leaf. It also owns the per-episode
//! hook: [`Evaluator::run_episode`] ships with a standard
//! select / expand / evaluate / backpropagate pass built on the engine's
//! primitives, and a concrete game and evaluator pairing may replace it.

use crate::constants::{DRAW_VALUE, WIN_VALUE};
use crate::error::SearchError;
use crate::game::{Game, Outcome};
use crate::playout::rollout;
use crate::search::SearchContext;
use crate::tree::Tree;

/// Trait for position evaluators.
///
/// Implementations could be:
/// - [`UniformEvaluator`]: equal priors, random playouts for values
/// - a neural network returning a policy head and a value head
pub trait Evaluator<G: Game>: Send + Sync {
    /// One prior per action, `game.action_count()` entries long. Entries at
    /// illegal actions are ignored.
    fn priors(&self, game: &G, state: &G::State) -> Vec<f64>;

    /// Probability that the player to move in `state` wins.
    ///
    /// `None` means the evaluator has no opinion and the leaf is scored by
    /// a random playout instead.
    fn value(&self, _game: &G, _state: &G::State) -> Option<f64> {
        None
    }

    /// Run one episode from the root of `tree`.
    ///
    /// Descends by sampling from the selection distribution, then at the
    /// leaf either backs up the game result or expands the leaf and backs
    /// up its value.
    fn run_episode(
        &self,
        ctx: &SearchContext<'_, G, Self>,
        tree: &mut Tree<G::State>,
        rng: &mut fastrand::Rng,
    ) -> Result<(), SearchError>
    where
        Self: Sized,
    {
        let game = ctx.game();

        let mut leaf = tree.root();
        while tree.get(leaf).is_expanded() {
            leaf = ctx.select_child(tree, leaf, rng)?;
        }

        let node = tree.get(leaf);
        let mover = game.player_to_move(&node.state);
        match game.winner(&node.state, node.action) {
            Outcome::Winner(winner) => ctx.backprop(tree, leaf, WIN_VALUE, winner),
            Outcome::Draw => ctx.backprop(tree, leaf, DRAW_VALUE, mover),
            Outcome::Ongoing => {
                ctx.expand(tree, leaf)?;
                let node = tree.get(leaf);
                let value = match self.value(game, &node.state) {
                    Some(value) => value,
                    None => rollout(game, &node.state, node.action, rng).value_for(&mover),
                };
                ctx.backprop(tree, leaf, value, mover);
            }
        }
        Ok(())
    }
}

/// Uniform evaluator that assigns equal probability to all legal actions.
/// Leaves are scored by random playouts.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<G: Game> Evaluator<G> for UniformEvaluator {
    fn priors(&self, game: &G, state: &G::State) -> Vec<f64> {
        let legal = game.legal_actions(state);
        let count = legal.iter().filter(|&&is_legal| is_legal).count();
        if count == 0 {
            return vec![0.0; legal.len()];
        }

        let prior = 1.0 / count as f64;
        legal
            .into_iter()
            .map(|is_legal| if is_legal { prior } else { 0.0 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tictactoe::{TicTacToe, TicTacToeState};

    #[test]
    fn test_uniform_evaluator() {
        let game = TicTacToe;
        let state = TicTacToeState::from_moves(&[0, 4, 8]).unwrap();
        let priors = UniformEvaluator::new().priors(&game, &state);

        assert_eq!(priors.len(), 9);
        for (cell, prior) in priors.iter().enumerate() {
            if [0, 4, 8].contains(&cell) {
                assert!(prior.abs() < 1e-12);
            } else {
                assert!((prior - 1.0 / 6.0).abs() < 1e-12);
            }
        }
        assert!(
            <UniformEvaluator as Evaluator<TicTacToe>>::value(&UniformEvaluator, &game, &state)
                .is_none()
        );
    }

    #[test]
    fn test_uniform_evaluator_no_legal_moves() {
        let game = TicTacToe;
        let state = TicTacToeState::from_moves(&[0, 3, 1, 4, 2]).unwrap();
        let priors = UniformEvaluator::new().priors(&game, &state);
        assert!(priors.iter().all(|p| p.abs() < 1e-12));
    }
}
