//! Search tree node representation.
//!
//! Each node holds one reachable game state together with the statistics
//! backed up through it. Nodes live in a [`Tree`](crate::tree::Tree) arena
//! and refer to each other by [`NodeId`].

use serde::{Deserialize, Serialize};

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Marks an absent parent or an empty child slot.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the search tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node<S> {
    /// Game state at this node. Never changes after construction.
    pub state: S,

    /// Action that led here from the parent (`None` for a fresh root).
    pub action: Option<usize>,

    /// Sum of values backed up through this node, credited to the player
    /// who moved into it.
    pub value: f64,

    /// Number of episodes that passed through this node.
    pub plays: u32,

    /// Legal action mask of `state`.
    pub legal_actions: Vec<bool>,

    /// Evaluator priors, zero at illegal actions.
    pub priors: Vec<f64>,

    /// Empty until expanded, then one slot per action. Illegal slots hold
    /// [`NodeId::NONE`].
    pub children: Vec<NodeId>,

    /// Non-owning back-reference ([`NodeId::NONE`] for the top of the tree).
    pub parent: NodeId,
}

impl<S> Node<S> {
    /// Create an unexpanded node. Priors at illegal actions are zeroed.
    pub fn new(
        state: S,
        action: Option<usize>,
        legal_actions: Vec<bool>,
        mut priors: Vec<f64>,
        parent: NodeId,
    ) -> Self {
        for (prior, &legal) in priors.iter_mut().zip(&legal_actions) {
            if !legal {
                *prior = 0.0;
            }
        }
        Self {
            state,
            action,
            value: 0.0,
            plays: 0,
            legal_actions,
            priors,
            children: Vec::new(),
            parent,
        }
    }

    /// Empirical win rate for the player who moved into this node.
    #[inline]
    pub fn win_rate(&self) -> f64 {
        if self.plays > 0 {
            self.value / self.plays as f64
        } else {
            0.0
        }
    }

    /// Average backed-up value, as reported for a search root.
    #[inline]
    pub fn avg_value(&self) -> f64 {
        self.win_rate()
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Size of the action space this node was built for.
    #[inline]
    pub fn action_count(&self) -> usize {
        self.legal_actions.len()
    }

    /// Child id at `action`, if the node is expanded and the slot is filled.
    pub fn child(&self, action: usize) -> Option<NodeId> {
        self.children.get(action).copied().filter(|id| id.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_node_masks_priors() {
        let node = Node::new(
            0u8,
            None,
            vec![true, false, true],
            vec![0.5, 0.3, 0.2],
            NodeId::NONE,
        );

        assert_eq!(node.priors, vec![0.5, 0.0, 0.2]);
        assert!(node.is_root());
        assert!(!node.is_expanded());
        assert_eq!(node.action_count(), 3);
        assert_eq!(node.plays, 0);
    }

    #[test]
    fn test_win_rate() {
        let mut node = Node::new((), None, vec![true], vec![1.0], NodeId::NONE);
        assert!(node.win_rate().abs() < 1e-12);

        node.plays = 4;
        node.value = 3.0;
        assert!((node.win_rate() - 0.75).abs() < 1e-12);
        assert!((node.avg_value() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_child_lookup() {
        let mut node = Node::new((), None, vec![true, false], vec![1.0, 0.0], NodeId::NONE);
        assert_eq!(node.child(0), None);

        node.children = vec![NodeId(1), NodeId::NONE];
        assert_eq!(node.child(0), Some(NodeId(1)));
        assert_eq!(node.child(1), None);
        assert_eq!(node.child(5), None);
    }
}
