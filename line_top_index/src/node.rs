//! Treap nodes and the arena that owns them.
//!
//! Nodes link to each other through [`NodeId`] indices into a single `Vec`.
//! Parent, left and right links form a cycle that the arena owns outright, so
//! rotations are plain index rewrites and deleted nodes return their slot to a
//! free list for reuse.
use crate::{logical_position::LogicalPosition, priority::Priority};
use rustc_hash::FxHashSet;
use std::ops::{Index, IndexMut};

/// Stable index of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    /// Id of the arena slot at `index`. The arena holds at most `u32::MAX`
    /// slots.
    fn from_slot(index: usize) -> Self {
        Self(u32::try_from(index).expect("node arena exceeds u32::MAX slots"))
    }
}

/// A row that anchors one or more blocks.
#[derive(Debug, Clone)]
pub(crate) struct Node<Id> {
    /// `None` only between creation by the cursor and the caller's rebalance.
    pub priority: Option<Priority>,
    /// Row and block pixels relative to the left ancestor.
    ///
    /// `pixels` covers the whole left subtree plus this node's own
    /// `block_height`.
    pub distance_from_left_ancestor: LogicalPosition,
    pub block_height: f64,
    /// Portion of `block_height` contributed by blocks rendered after the row.
    pub following_block_height: f64,
    pub block_ids: FxHashSet<Id>,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl<Id> Node<Id> {
    fn new(distance_from_left_ancestor: LogicalPosition, parent: Option<NodeId>) -> Self {
        Self {
            priority: None,
            distance_from_left_ancestor,
            block_height: 0.0,
            following_block_height: 0.0,
            block_ids: FxHashSet::default(),
            parent,
            left: None,
            right: None,
        }
    }
}

impl<Id> Default for Node<Id> {
    fn default() -> Self {
        Self::new(LogicalPosition::default(), None)
    }
}

/// Arena-backed treap.
#[derive(Debug, Clone)]
pub(crate) struct Tree<Id> {
    nodes: Vec<Node<Id>>,
    free: Vec<NodeId>,
    pub root: Option<NodeId>,
}

impl<Id> Tree<Id> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
        }
    }

    /// Allocate a detached node, reusing a freed slot when one is available.
    pub fn alloc(
        &mut self,
        distance_from_left_ancestor: LogicalPosition,
        parent: Option<NodeId>,
    ) -> NodeId {
        let node = Node::new(distance_from_left_ancestor, parent);
        if let Some(id) = self.free.pop() {
            self[id] = node;
            id
        } else {
            let id = NodeId::from_slot(self.nodes.len());
            self.nodes.push(node);
            id
        }
    }

    /// Return a node's slot to the free list, handing back its contents.
    ///
    /// The caller is responsible for unlinking the node first.
    pub fn release(&mut self, id: NodeId) -> Node<Id> {
        self.free.push(id);
        std::mem::take(&mut self[id])
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Length of the longest root-to-leaf path, counted in nodes.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|root| (root, 1)).into_iter().collect();
        while let Some((id, level)) = stack.pop() {
            depth = depth.max(level);
            let node = &self[id];
            stack.extend(node.left.map(|left| (left, level + 1)));
            stack.extend(node.right.map(|right| (right, level + 1)));
        }
        depth
    }

    /// Priority used for heap comparisons. A node without one never rises.
    pub fn priority_of(&self, id: NodeId) -> Priority {
        self[id].priority.unwrap_or(Priority::Retired)
    }
}

impl<Id> Index<NodeId> for Tree<Id> {
    type Output = Node<Id>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0 as usize]
    }
}

impl<Id> IndexMut<NodeId> for Tree<Id> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0 as usize]
    }
}
