//! Search driver.
//!
//! [`Engine`] owns the rules, the evaluator, the configuration and the
//! persistent search tree. Each [`Engine::find_move`] call grows the tree
//! from its current root until the time or play budget runs out, then
//! picks the child with the best win rate.
//!
//! With more than one worker configured, every call instead runs that many
//! independent searches on a rayon pool, each on a fresh tree, and merges
//! their one-ply results into the engine tree.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::evaluator::Evaluator;
use crate::game::Game;
use crate::node::{Node, NodeId};
use crate::tree::Tree;

/// Read-only view of the engine handed to episodes.
///
/// Bundles the primitives an [`Evaluator::run_episode`] implementation
/// builds on: node creation, expansion, selection and backpropagation.
pub struct SearchContext<'a, G, E> {
    game: &'a G,
    evaluator: &'a E,
    exploration_rate: f64,
}

impl<'a, G, E> SearchContext<'a, G, E>
where
    G: Game,
    E: Evaluator<G>,
{
    pub fn new(game: &'a G, evaluator: &'a E, exploration_rate: f64) -> Self {
        Self {
            game,
            evaluator,
            exploration_rate,
        }
    }

    #[inline]
    pub fn game(&self) -> &'a G {
        self.game
    }

    #[inline]
    pub fn evaluator(&self) -> &'a E {
        self.evaluator
    }

    #[inline]
    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Build an unexpanded node for `state`, querying the legal mask and
    /// the evaluator priors once.
    pub fn new_node(
        &self,
        state: G::State,
        action: Option<usize>,
        parent: NodeId,
    ) -> Result<Node<G::State>, SearchError> {
        let expected = self.game.action_count();

        let legal = self.game.legal_actions(&state);
        if legal.len() != expected {
            return Err(SearchError::InvalidActionMask {
                expected,
                actual: legal.len(),
            });
        }

        let priors = self.evaluator.priors(self.game, &state);
        if priors.len() != expected {
            return Err(SearchError::InvalidPriors {
                expected,
                actual: priors.len(),
            });
        }

        Ok(Node::new(state, action, legal, priors, parent))
    }

    /// Create one child per legal action of `id`.
    ///
    /// Illegal slots stay [`NodeId::NONE`]. Already expanded nodes are left
    /// alone. Every child is built before any is attached, so a failure
    /// leaves the node unexpanded.
    pub fn expand(&self, tree: &mut Tree<G::State>, id: NodeId) -> Result<(), SearchError> {
        let node = tree.get(id);
        if node.is_expanded() {
            return Ok(());
        }

        let mut children = Vec::with_capacity(node.action_count());
        for (action, &legal) in node.legal_actions.iter().enumerate() {
            if !legal {
                children.push(None);
                continue;
            }
            let state = self
                .game
                .apply_action(&node.state, action)
                .ok_or(SearchError::MissingSuccessor { action })?;
            children.push(Some(self.new_node(state, Some(action), id)?));
        }

        let slots = children
            .into_iter()
            .map(|child| match child {
                Some(child) => tree.allocate(child),
                None => Ok(NodeId::NONE),
            })
            .collect::<Result<Vec<_>, _>>()?;
        trace!(
            node = id.0,
            children = slots.iter().filter(|c| c.is_some()).count(),
            "Expanded node"
        );
        tree.get_mut(id).children = slots;
        Ok(())
    }

    /// Pick an action at `id`: sampled from the selection distribution when
    /// `exploring`, the greedy best otherwise.
    pub fn select_action(
        &self,
        tree: &Tree<G::State>,
        id: NodeId,
        exploring: bool,
        rng: &mut fastrand::Rng,
    ) -> Result<usize, SearchError> {
        if exploring {
            tree.sample_action(id, self.exploration_rate(), rng)
        } else {
            tree.greedy_action(id)
        }
    }

    /// Sample the child to descend into from `id`.
    pub fn select_child(
        &self,
        tree: &Tree<G::State>,
        id: NodeId,
        rng: &mut fastrand::Rng,
    ) -> Result<NodeId, SearchError> {
        let action = self.select_action(tree, id, true, rng)?;
        tree.get(id)
            .child(action)
            .ok_or(SearchError::EmptySlot { action })
    }

    /// Back `value`, a win probability for `player_for_value`, up from `leaf`.
    pub fn backprop(
        &self,
        tree: &mut Tree<G::State>,
        leaf: NodeId,
        value: f64,
        player_for_value: G::Player,
    ) {
        tree.backprop(self.game, leaf, value, player_for_value);
    }
}

/// Stopping rule for one `find_move` call.
#[derive(Debug, Clone, Copy)]
struct Budget {
    deadline: Option<Instant>,
    play_limit: Option<u32>,
}

impl Budget {
    fn new(time_limit: Option<Duration>, play_limit: Option<u32>) -> Result<Self, SearchError> {
        if time_limit.is_none() && play_limit.is_none() {
            return Err(SearchError::NoBudget);
        }
        Ok(Self {
            deadline: time_limit.map(|limit| Instant::now() + limit),
            play_limit,
        })
    }

    /// Either limit being reached ends the search.
    fn exhausted(&self, root_plays: u32) -> bool {
        self.play_limit.is_some_and(|limit| root_plays >= limit)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Run episodes on `tree` until `budget` is exhausted. Returns the number
/// of episodes run.
fn run_search<G, E>(
    ctx: &SearchContext<'_, G, E>,
    tree: &mut Tree<G::State>,
    budget: &Budget,
    rng: &mut fastrand::Rng,
) -> Result<u32, SearchError>
where
    G: Game,
    E: Evaluator<G>,
{
    let mut episodes = 0;
    while !budget.exhausted(tree.get(tree.root()).plays) {
        ctx.evaluator().run_episode(ctx, tree, rng)?;
        episodes += 1;
    }
    Ok(episodes)
}

/// Search `state` on one fresh tree per seed and return each tree cut down
/// to one ply, in seed order.
fn run_workers<G, E>(
    pool: &ThreadPool,
    ctx: &SearchContext<'_, G, E>,
    state: &G::State,
    budget: &Budget,
    seeds: Vec<u64>,
) -> Result<Vec<Tree<G::State>>, SearchError>
where
    G: Game,
    E: Evaluator<G>,
{
    pool.install(|| {
        seeds
            .into_par_iter()
            .enumerate()
            .map(|(worker, seed)| -> Result<Tree<G::State>, SearchError> {
                let mut rng = fastrand::Rng::with_seed(seed);
                let mut tree = Tree::new(ctx.new_node(state.clone(), None, NodeId::NONE)?);
                let episodes = run_search(ctx, &mut tree, budget, &mut rng)?;
                trace!(worker, episodes, "Worker finished");
                Ok(tree.into_one_ply())
            })
            .collect()
    })
}

fn build_pool(workers: usize) -> Result<Option<ThreadPool>, SearchError> {
    if workers <= 1 {
        return Ok(None);
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("search-worker-{index}"))
        .build()?;
    Ok(Some(pool))
}

/// Outcome of a [`Engine::find_move`] call.
#[derive(Debug, Clone)]
pub struct SearchResult<S> {
    /// State after playing `action` from the searched state.
    pub state: S,
    /// Chosen action.
    pub action: usize,
    /// Average value of the root.
    pub value: f64,
    /// Selection distribution over the root's actions.
    pub probabilities: Vec<f64>,
}

/// Serializable engine state: configuration and tree, without the worker
/// pool or the random number generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot<S> {
    pub config: SearchConfig,
    pub tree: Option<Tree<S>>,
}

/// MCTS engine with a persistent tree.
pub struct Engine<G: Game, E> {
    game: G,
    evaluator: E,
    config: SearchConfig,
    tree: Option<Tree<G::State>>,
    pool: Option<ThreadPool>,
    rng: fastrand::Rng,
}

impl<G, E> Engine<G, E>
where
    G: Game,
    E: Evaluator<G>,
{
    /// Create an engine with no tree. Builds the worker pool when
    /// `config.workers > 1`.
    pub fn new(game: G, evaluator: E, config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let pool = build_pool(config.workers)?;
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        debug!(?config, "Created search engine");

        Ok(Self {
            game,
            evaluator,
            config,
            tree: None,
            pool,
            rng,
        })
    }

    /// Restore an engine from a snapshot. A fresh pool and RNG are built
    /// from the snapshot's configuration.
    ///
    /// The tree is checked with [`Tree::validate`] first, so a damaged
    /// snapshot is rejected here instead of failing inside a search.
    pub fn from_snapshot(
        game: G,
        evaluator: E,
        snapshot: EngineSnapshot<G::State>,
    ) -> Result<Self, SearchError> {
        if let Some(tree) = &snapshot.tree {
            tree.validate(game.action_count())?;
        }
        let mut engine = Self::new(game, evaluator, snapshot.config)?;
        engine.tree = snapshot.tree;
        Ok(engine)
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The current search tree, if any.
    pub fn tree(&self) -> Option<&Tree<G::State>> {
        self.tree.as_ref()
    }

    /// Search `state` and return the best action found.
    ///
    /// `move_time` and `play_limit` override the configured budget. Without
    /// a tree, one is created from `state`; an existing tree must be rooted
    /// at `state`. The play limit counts the root's total plays, including
    /// those kept from earlier searches.
    pub fn find_move(
        &mut self,
        state: &G::State,
        move_time: Option<Duration>,
        play_limit: Option<u32>,
    ) -> Result<SearchResult<G::State>, SearchError> {
        let budget = Budget::new(
            move_time.or(self.config.time_limit()),
            play_limit.or(self.config.play_limit),
        )?;
        let ctx = SearchContext::new(&self.game, &self.evaluator, self.config.exploration_rate);

        let tree = match self.tree.take() {
            Some(tree) => tree,
            None => Tree::new(ctx.new_node(state.clone(), None, NodeId::NONE)?),
        };
        if tree.get(tree.root()).state != *state {
            self.tree = Some(tree);
            return Err(SearchError::RootMismatch);
        }
        let tree = self.tree.insert(tree);
        let root = tree.root();

        let started = Instant::now();
        let episodes = match &self.pool {
            None => run_search(&ctx, tree, &budget, &mut self.rng)?,
            Some(pool) => {
                let seeds = (0..self.config.workers).map(|_| self.rng.u64(..)).collect();
                let workers = run_workers(pool, &ctx, state, &budget, seeds)?;
                let sources: Vec<(&Tree<G::State>, NodeId)> =
                    workers.iter().map(|worker| (worker, worker.root())).collect();
                tree.merge_all(root, &sources)?;
                trace!(workers = workers.len(), nodes = tree.len(), "Merged worker trees");
                workers.iter().map(|worker| worker.get(worker.root()).plays).sum::<u32>()
            }
        };

        let action = tree.greedy_action(root)?;
        let node = tree.get(root);
        let child = node.child(action).ok_or(SearchError::EmptySlot { action })?;
        let result = SearchResult {
            state: tree.get(child).state.clone(),
            action,
            value: node.avg_value(),
            probabilities: tree.child_selection_probability(root, self.config.exploration_rate),
        };

        debug!(
            action,
            episodes,
            root_plays = node.plays,
            value = result.value,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search finished"
        );
        Ok(result)
    }

    /// Follow `states` down the tree, one ply per state.
    ///
    /// The tree is dropped as soon as a state matches no child of the
    /// current root. Without a tree this does nothing.
    pub fn move_root(&mut self, states: &[G::State]) {
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        for state in states {
            if !tree.advance_root(state) {
                debug!(?state, "State not found below root, dropping tree");
                self.tree = None;
                return;
            }
        }
    }

    /// Move the root back to the top of the tree, keeping all statistics.
    pub fn reset_root(&mut self) {
        if let Some(tree) = self.tree.as_mut() {
            tree.reset_root();
        }
    }

    /// Discard the tree. The next search starts from scratch.
    pub fn drop_root(&mut self) {
        self.tree = None;
    }

    pub fn snapshot(&self) -> EngineSnapshot<G::State> {
        EngineSnapshot {
            config: self.config.clone(),
            tree: self.tree.clone(),
        }
    }
}
