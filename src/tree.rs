//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by [`NodeId`]
//! indices. Children are owned through their slot in the parent, the parent
//! link is a plain index, so dropping a tree is a flat free.
//!
//! The tree keeps every node it ever allocated until it is dropped. Moving
//! the root down only changes which node searches start from, so the old
//! top of the tree can be recovered with [`Tree::reset_root`].

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::game::Game;
use crate::node::{Node, NodeId};

/// Search tree with arena-based node storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree<S> {
    nodes: Vec<Node<S>>,
    root: NodeId,
}

impl<S> Tree<S> {
    /// Create a tree holding a single root node.
    pub fn new(root: Node<S>) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// The node searches start from.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.index()]
    }

    /// Allocate a new node and return its id.
    pub fn allocate(&mut self, node: Node<S>) -> Result<NodeId, SearchError> {
        let id = next_id(self.nodes.len())?;
        self.nodes.push(node);
        Ok(id)
    }

    /// Total number of nodes in the arena, including nodes above the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Win rate of each child slot, 0 where the slot is empty.
    pub fn child_win_rates(&self, id: NodeId) -> Vec<f64> {
        let node = self.get(id);
        (0..node.action_count())
            .map(|action| node.child(action).map_or(0.0, |c| self.get(c).win_rate()))
            .collect()
    }

    /// Visit count of each child slot, 0 where the slot is empty.
    pub fn child_visit_counts(&self, id: NodeId) -> Vec<u32> {
        let node = self.get(id);
        (0..node.action_count())
            .map(|action| node.child(action).map_or(0, |c| self.get(c).plays))
            .collect()
    }

    /// Selection distribution over the actions of `id`.
    ///
    /// Each action scores `win_rate + f * prior * plays / (1 + child_visits)`.
    /// Scores are normalized by their sum and illegal actions are zeroed.
    /// When every score is zero the distribution falls back to the
    /// normalized priors, then to uniform over legal actions.
    pub fn child_selection_probability(&self, id: NodeId, exploration_factor: f64) -> Vec<f64> {
        let node = self.get(id);
        let rates = self.child_win_rates(id);
        let visits = self.child_visit_counts(id);
        let plays = node.plays as f64;

        let mut scores: Vec<f64> = rates
            .iter()
            .zip(&visits)
            .zip(&node.priors)
            .map(|((rate, &visits), prior)| {
                rate + exploration_factor * prior * plays / (1.0 + visits as f64)
            })
            .collect();

        let total: f64 = scores.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return prior_distribution(node);
        }

        for (score, &legal) in scores.iter_mut().zip(&node.legal_actions) {
            *score = if legal { *score / total } else { 0.0 };
        }
        scores
    }

    /// Legal action with the highest child win rate, first index on ties.
    pub fn greedy_action(&self, id: NodeId) -> Result<usize, SearchError> {
        let node = self.get(id);
        if !node.is_expanded() {
            return Err(SearchError::NotExpanded);
        }

        let mut best: Option<(usize, f64)> = None;
        for (action, rate) in self.child_win_rates(id).into_iter().enumerate() {
            if !node.legal_actions[action] || node.child(action).is_none() {
                continue;
            }
            if best.is_none_or(|(_, best_rate)| rate > best_rate) {
                best = Some((action, rate));
            }
        }

        best.map(|(action, _)| action)
            .ok_or(SearchError::NoLegalActions)
    }

    /// Sample an action from [`Tree::child_selection_probability`].
    pub fn sample_action(
        &self,
        id: NodeId,
        exploration_factor: f64,
        rng: &mut fastrand::Rng,
    ) -> Result<usize, SearchError> {
        if !self.get(id).is_expanded() {
            return Err(SearchError::NotExpanded);
        }

        let probabilities = self.child_selection_probability(id, exploration_factor);
        let total: f64 = probabilities.iter().sum();
        if total <= 0.0 {
            return Err(SearchError::NoLegalActions);
        }

        let mut remaining = rng.f64() * total;
        for (action, &p) in probabilities.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            if remaining < p {
                return Ok(action);
            }
            remaining -= p;
        }

        // Rounding left a sliver past the last bucket.
        probabilities
            .iter()
            .rposition(|&p| p > 0.0)
            .ok_or(SearchError::NoLegalActions)
    }

    /// Back a value up from `leaf` through every ancestor.
    ///
    /// Each node on the way gets one more play. A node with a parent is
    /// also credited `value` when the parent's mover is `player_for_value`
    /// and `1 - value` otherwise, i.e. as a win probability for the player
    /// who moved into it. The parentless top of the tree gets no value.
    pub fn backprop<G>(&mut self, game: &G, leaf: NodeId, value: f64, player_for_value: G::Player)
    where
        G: Game<State = S>,
    {
        let mut current = leaf;
        while current.is_some() {
            let parent = self.get(current).parent;
            let credit = parent.is_some().then(|| {
                if game.player_to_move(&self.get(parent).state) == player_for_value {
                    value
                } else {
                    1.0 - value
                }
            });

            let node = self.get_mut(current);
            node.plays += 1;
            if let Some(credit) = credit {
                node.value += credit;
            }
            current = parent;
        }
    }

    /// Move the root to the child holding `state`. Returns false, leaving
    /// the root in place, when no child matches.
    pub fn advance_root(&mut self, state: &S) -> bool
    where
        S: PartialEq,
    {
        let found = self
            .get(self.root)
            .children
            .iter()
            .copied()
            .filter(|id| id.is_some())
            .find(|&id| self.get(id).state == *state);

        match found {
            Some(id) => {
                self.root = id;
                true
            }
            None => false,
        }
    }

    /// Walk parent links up to the top of the tree.
    pub fn reset_root(&mut self) {
        while self.get(self.root).parent.is_some() {
            self.root = self.get(self.root).parent;
        }
    }

    /// Keep only the root and its direct children.
    ///
    /// Children lose their own subtrees and the root loses its parent, so
    /// the result is a small self-contained value that can cross a worker
    /// boundary.
    pub fn into_one_ply(self) -> Self {
        let Tree { nodes, root } = self;
        let mut slots: Vec<Option<Node<S>>> = nodes.into_iter().map(Some).collect();
        let mut compact = Vec::new();

        if let Some(mut top) = slots[root.index()].take() {
            let children = std::mem::take(&mut top.children);
            top.parent = NodeId::NONE;
            compact.push(top);

            let mut slots_out = Vec::with_capacity(children.len());
            for id in children {
                let child = if id.is_some() { slots[id.index()].take() } else { None };
                match child {
                    Some(mut child) => {
                        child.children.clear();
                        child.parent = NodeId(0);
                        slots_out.push(NodeId(compact.len() as u32));
                        compact.push(child);
                    }
                    None => slots_out.push(NodeId::NONE),
                }
            }
            compact[0].children = slots_out;
        }

        Self {
            nodes: compact,
            root: NodeId(0),
        }
    }

    /// Merge the nodes `sources` into `target`.
    ///
    /// Statistics of every source are summed into `target`. If `target` is
    /// unexpanded, the first expanded source donates its children (copied
    /// with their subtrees) and takes no further part in the merge below
    /// this level. The remaining expanded sources are then merged child by
    /// child into whatever children `target` has.
    pub fn merge_all(
        &mut self,
        target: NodeId,
        sources: &[(&Tree<S>, NodeId)],
    ) -> Result<(), SearchError>
    where
        S: Clone,
    {
        let node = self.get_mut(target);
        for (tree, id) in sources {
            let source = tree.get(*id);
            node.plays += source.plays;
            node.value += source.value;
        }

        let mut continued: Vec<(&Tree<S>, NodeId)> = sources
            .iter()
            .copied()
            .filter(|(tree, id)| tree.get(*id).is_expanded())
            .collect();
        if continued.is_empty() {
            return Ok(());
        }

        if !self.get(target).is_expanded() {
            let (backbone, id) = continued.remove(0);
            self.adopt_children(target, backbone, id)?;
        }

        let children = self.get(target).children.clone();
        for (action, child) in children.into_iter().enumerate() {
            if child.is_none() {
                continue;
            }
            let next: Vec<(&Tree<S>, NodeId)> = continued
                .iter()
                .filter_map(|(tree, id)| tree.get(*id).child(action).map(|c| (*tree, c)))
                .collect();
            self.merge_all(child, &next)?;
        }
        Ok(())
    }

    /// Copy the child slots of `source`'s node `id` under `target`.
    fn adopt_children(
        &mut self,
        target: NodeId,
        source: &Tree<S>,
        id: NodeId,
    ) -> Result<(), SearchError>
    where
        S: Clone,
    {
        let adopted = source
            .get(id)
            .children
            .iter()
            .map(|&child| {
                if child.is_some() {
                    self.graft(target, source, child)
                } else {
                    Ok(NodeId::NONE)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.get_mut(target).children = adopted;
        Ok(())
    }

    /// Copy the subtree rooted at `source`'s node `id` into this arena under
    /// `parent`.
    fn graft(
        &mut self,
        parent: NodeId,
        source: &Tree<S>,
        id: NodeId,
    ) -> Result<NodeId, SearchError>
    where
        S: Clone,
    {
        let source_node = source.get(id);
        let mut copy = source_node.clone();
        copy.parent = parent;
        copy.children = Vec::new();
        let copy_id = self.allocate(copy)?;

        if source_node.is_expanded() {
            self.adopt_children(copy_id, source, id)?;
        }
        Ok(copy_id)
    }

    /// Check the arena invariants a deserialized tree may have lost.
    ///
    /// Every id must be in bounds, parent and child links must agree,
    /// parent chains must end, and every node must carry `action_count`
    /// mask and prior entries with either zero or `action_count` child
    /// slots.
    pub fn validate(&self, action_count: usize) -> Result<(), SearchError> {
        let invalid = |reason: String| Err(SearchError::InvalidTree(reason));

        if self.is_empty() {
            return invalid("arena holds no nodes".to_string());
        }
        if next_id(self.len()).is_err() {
            return invalid(format!("arena holds {} nodes", self.len()));
        }
        if !self.contains(self.root) {
            return invalid(format!("root {} is out of bounds", self.root.0));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index as u32);
            if node.legal_actions.len() != action_count || node.priors.len() != action_count {
                return invalid(format!(
                    "node {index} has {} mask and {} prior entries, expected {action_count}",
                    node.legal_actions.len(),
                    node.priors.len()
                ));
            }
            if node.is_expanded() && node.children.len() != action_count {
                return invalid(format!(
                    "node {index} has {} child slots, expected {action_count}",
                    node.children.len()
                ));
            }
            for &child in node.children.iter().filter(|c| c.is_some()) {
                if !self.contains(child) || self.get(child).parent != id {
                    return invalid(format!("node {index} has a dangling child {}", child.0));
                }
            }
            if node.parent.is_some()
                && (!self.contains(node.parent) || !self.get(node.parent).children.contains(&id))
            {
                return invalid(format!("node {index} has a dangling parent {}", node.parent.0));
            }
        }

        // Parent links agree with child links, so a chain longer than the
        // arena can only be a cycle.
        for index in 0..self.len() {
            let mut current = NodeId(index as u32);
            let mut steps = 0;
            while current.is_some() {
                if steps > self.len() {
                    return invalid(format!("node {index} sits on a parent cycle"));
                }
                current = self.get(current).parent;
                steps += 1;
            }
        }
        Ok(())
    }

    fn contains(&self, id: NodeId) -> bool {
        id.is_some() && id.index() < self.nodes.len()
    }

    /// Summary of the subtree below the current root.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_plays: root.plays,
            root_value: root.avg_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(id);
        node.children
            .iter()
            .filter(|child| child.is_some())
            .map(|&child| self.compute_max_depth(child, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Id of the node stored at arena index `len`. The last `u32` value is
/// reserved for [`NodeId::NONE`].
fn next_id(len: usize) -> Result<NodeId, SearchError> {
    match u32::try_from(len) {
        Ok(index) if index != NodeId::NONE.0 => Ok(NodeId(index)),
        _ => Err(SearchError::TreeFull),
    }
}

/// Normalized legal priors, or uniform over legal actions when the priors
/// carry no mass.
fn prior_distribution<S>(node: &Node<S>) -> Vec<f64> {
    let total: f64 = node.priors.iter().sum();
    if total > 0.0 && total.is_finite() {
        return node.priors.iter().map(|p| p / total).collect();
    }

    let legal = node.legal_actions.iter().filter(|&&legal| legal).count();
    node.legal_actions
        .iter()
        .map(|&is_legal| {
            if is_legal {
                1.0 / legal as f64
            } else {
                0.0
            }
        })
        .collect()
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_plays: u32,
    pub root_value: f64,
    pub max_depth: u32,
}
