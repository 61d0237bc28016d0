//! [`LineTopIndex`]: block bookkeeping, rebalancing and splicing.
//!
//! # Rotations
//!
//! Offsets are relative to the left ancestor, so a rotation touches exactly
//! one cached offset:
//!
//! ```text
//!        root                 pivot
//!       /    \    left       /     \
//!      A    pivot  ==>     root     C      pivot += root
//!           /   \         /    \
//!          B     C       A      B
//!
//!          root             pivot
//!         /    \   right    /    \
//!      pivot    C   ==>    A     root      root -= pivot
//!      /   \                     /   \
//!     A     B                   B     C
//! ```
//!
//! After a left rotation the pivot inherits the root's left ancestor, so it
//! absorbs the root's offset. After a right rotation the root becomes the
//! pivot's right child and is re-expressed relative to it. Subtrees `A`, `B`
//! and `C` keep their left ancestors and therefore their offsets.
//!
//! # Splice
//!
//! ```text
//! before:   ... [start] ... (start, old_end) ... [old_end] ... after ...
//!
//!                   end (SpliceEnd, root)
//!                  /                     \
//!         start (SpliceStart)          rows > old_end
//!          /              \
//!   rows < start     rows in (start, old_end)   <- detached, blocks moved to end
//! ```
//!
//! With both boundaries pinned at the top, relabeling `end` to
//! `start + new_extent` shifts its whole right subtree at once. Rows are
//! tracked as `u64` internally, so a growing splice never wraps. Anchors
//! pushed past `u32::MAX` report `u32::MAX` from [`LineTopIndex::block_row`]
//! and sit after every row a query can name.
use crate::{
    config::IndexConfig,
    cursor::Tie,
    error::{DuplicateBlockSnafu, Error, InvalidHeightSnafu, Result, UnknownBlockSnafu},
    logical_position::clamp_row,
    node::{NodeId, Tree},
    priority::{Priority, RandomSource},
};
use rand::{rngs::StdRng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use snafu::ensure;
use std::{fmt::Debug, hash::Hash};

/// Requirements on caller-supplied block identifiers.
pub trait BlockId: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> BlockId for T {}

/// Maps rows to pixel offsets in the presence of block decorations.
///
/// Positions are `row * default_line_height` plus the heights of the blocks
/// that precede the row. A block anchored at row `r` precedes the text of `r`
/// unless it was inserted with `is_after_row`, in which case it sits between
/// rows `r` and `r + 1`.
#[derive(Debug, Clone)]
pub struct LineTopIndex<Id, R = StdRng> {
    tree: Tree<Id>,
    random: R,
    default_line_height: f64,
    block_nodes: FxHashMap<Id, NodeId>,
    block_heights: FxHashMap<Id, f64>,
    following_block_ids: FxHashSet<Id>,
}

impl<Id: BlockId> LineTopIndex<Id, StdRng> {
    /// Create an empty index. Priorities are seeded from `config.seed` when
    /// set, otherwise from OS entropy.
    pub fn new(config: IndexConfig) -> Self {
        let random = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_random_source(config.default_line_height, random)
    }
}

impl<Id: BlockId, R: RandomSource> LineTopIndex<Id, R> {
    /// Create an empty index drawing priorities from `random`.
    pub fn with_random_source(default_line_height: f64, random: R) -> Self {
        Self {
            tree: Tree::new(),
            random,
            default_line_height,
            block_nodes: FxHashMap::default(),
            block_heights: FxHashMap::default(),
            following_block_ids: FxHashSet::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.block_nodes.is_empty()
    }

    /// Number of tracked blocks.
    pub fn len(&self) -> usize {
        self.block_nodes.len()
    }

    pub fn default_line_height(&self) -> f64 {
        self.default_line_height
    }

    /// Change the uniform row height. Applies to every later query.
    pub fn set_default_line_height(&mut self, default_line_height: f64) {
        self.default_line_height = default_line_height;
    }

    pub fn contains_block(&self, id: &Id) -> bool {
        self.block_nodes.contains_key(id)
    }

    pub fn block_height(&self, id: &Id) -> Option<f64> {
        self.block_heights.get(id).copied()
    }

    pub fn is_after_row(&self, id: &Id) -> Option<bool> {
        self.contains_block(id)
            .then(|| self.following_block_ids.contains(id))
    }

    /// Current anchor row of a block, following any splices since insertion.
    /// Saturates at `u32::MAX`.
    pub fn block_row(&self, id: &Id) -> Option<u32> {
        let mut current = *self.block_nodes.get(id)?;
        let mut row = self.tree[current].distance_from_left_ancestor.rows;
        while let Some(parent) = self.tree[current].parent {
            if self.tree[parent].right == Some(current) {
                row += self.tree[parent].distance_from_left_ancestor.rows;
            }
            current = parent;
        }
        Some(clamp_row(row))
    }

    /// Height of the tree in nodes. Expected to stay within a small multiple
    /// of `log2(rows with blocks)`.
    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    /// Anchor a block of `height` pixels at `row`.
    pub fn insert_block(&mut self, id: Id, row: u32, height: f64, is_after_row: bool) -> Result<()> {
        ensure_valid_height(height)?;
        ensure!(
            !self.block_nodes.contains_key(&id),
            DuplicateBlockSnafu {
                id: format!("{id:?}")
            }
        );

        let (node, created) = self.tree.insert_node(u64::from(row), Tie::Reuse);
        if created {
            self.tree[node].priority = Some(Priority::random(&mut self.random));
            self.tree.bubble_up(node);
        }

        self.tree.adjust_node_block_height(node, height, is_after_row);
        self.tree[node].block_ids.insert(id.clone());
        self.block_nodes.insert(id.clone(), node);
        self.block_heights.insert(id.clone(), height);
        if is_after_row {
            self.following_block_ids.insert(id);
        }
        Ok(())
    }

    pub fn remove_block(&mut self, id: &Id) -> Result<()> {
        let node = self
            .block_nodes
            .remove(id)
            .ok_or_else(|| unknown_block(id))?;
        let height = self.block_heights.remove(id).unwrap_or(0.0);
        let is_after_row = self.following_block_ids.remove(id);

        self.tree
            .adjust_node_block_height(node, -height, is_after_row);
        self.tree[node].block_ids.remove(id);
        if self.tree[node].block_ids.is_empty() {
            self.tree.delete_node(node);
        }
        Ok(())
    }

    /// Change a block's height in place. The tree shape is untouched.
    pub fn resize_block(&mut self, id: &Id, new_height: f64) -> Result<()> {
        ensure_valid_height(new_height)?;
        let node = *self.block_nodes.get(id).ok_or_else(|| unknown_block(id))?;
        let Some(height) = self.block_heights.get_mut(id) else {
            return Err(unknown_block(id));
        };

        let delta = new_height - *height;
        *height = new_height;
        let is_after_row = self.following_block_ids.contains(id);
        self.tree.adjust_node_block_height(node, delta, is_after_row);
        Ok(())
    }

    /// Re-anchor a block at `new_row`, keeping its height and placement.
    pub fn move_block(&mut self, id: &Id, new_row: u32) -> Result<()> {
        let height = self.block_height(id).ok_or_else(|| unknown_block(id))?;
        let is_after_row = self.following_block_ids.contains(id);
        self.remove_block(id)?;
        self.insert_block(id.clone(), new_row, height, is_after_row)
    }

    /// Replace rows `start..start + old_extent` with `new_extent` new rows.
    ///
    /// Blocks anchored inside `start..=start + old_extent` collapse onto row
    /// `start + new_extent`; blocks after the range shift by
    /// `new_extent - old_extent`. Returns the ids of the collapsed blocks.
    pub fn splice(&mut self, start: u32, old_extent: u32, new_extent: u32) -> FxHashSet<Id> {
        if self.is_empty() || (old_extent == 0 && new_extent == 0) {
            return FxHashSet::default();
        }

        let old_end = u64::from(start) + u64::from(old_extent);
        let new_end = u64::from(start) + u64::from(new_extent);
        tracing::trace!("LineTopIndex.splice: start={start}, old_end={old_end}, new_end={new_end}");

        let (start_node, _) = self.tree.insert_node(u64::from(start), Tie::Reuse);
        self.tree[start_node].priority = Some(Priority::SpliceStart);
        self.tree.bubble_up(start_node);

        // An insertion has both boundaries on one row; the end still needs
        // its own node to carry the shifted blocks.
        let tie = if old_extent == 0 { Tie::Split } else { Tie::Reuse };
        let (end_node, _) = self.tree.insert_node(old_end, tie);
        self.tree[end_node].priority = Some(Priority::SpliceEnd);
        self.tree.bubble_up(end_node);

        debug_assert_eq!(self.tree.root, Some(end_node));
        debug_assert_eq!(self.tree[end_node].left, Some(start_node));

        // The end node's cached pixels cover the start node's subtree, so
        // moving blocks from there onto the end node leaves them unchanged.
        let boundary = &mut self.tree[start_node];
        boundary.distance_from_left_ancestor.pixels -= boundary.block_height;
        boundary.block_height = 0.0;
        boundary.following_block_height = 0.0;
        let mut moved: Vec<Id> = boundary.block_ids.drain().collect();
        if let Some(spliced) = self.tree[start_node].right.take() {
            moved.extend(self.tree.drain_subtree(spliced));
        }

        for id in moved {
            let height = self.block_heights.get(&id).copied().unwrap_or(0.0);
            let end = &mut self.tree[end_node];
            end.block_height += height;
            if self.following_block_ids.contains(&id) {
                end.following_block_height += height;
            }
            end.block_ids.insert(id.clone());
            self.block_nodes.insert(id, end_node);
        }

        // The end node is the root, so its offset is absolute.
        self.tree[end_node].distance_from_left_ancestor.rows = new_end;
        let touched = self.tree[end_node].block_ids.clone();

        if new_end == u64::from(start) {
            let end = &mut self.tree[end_node];
            let height = std::mem::take(&mut end.block_height);
            let following = std::mem::take(&mut end.following_block_height);
            let ids: Vec<Id> = end.block_ids.drain().collect();

            let boundary = &mut self.tree[start_node];
            boundary.block_height += height;
            boundary.following_block_height += following;
            boundary.distance_from_left_ancestor.pixels += height;
            for id in ids {
                boundary.block_ids.insert(id.clone());
                self.block_nodes.insert(id, start_node);
            }
            self.tree.delete_node(end_node);
        } else {
            self.reseat_or_delete(end_node);
        }
        self.reseat_or_delete(start_node);

        tracing::debug!(
            "LineTopIndex.splice: touched={}, nodes={}",
            touched.len(),
            self.tree.node_count()
        );
        touched
    }

    /// Pixel offset of the top of the first block rendered above `row`.
    pub fn pixel_position_before_blocks_for_row(&self, row: u32) -> f64 {
        let mut pixel_position = f64::from(row) * self.default_line_height;
        if !self.is_empty() {
            pixel_position += self.tree.exclusive_total_block_pixels_preceding_row(u64::from(row));
        }
        pixel_position
    }

    /// Pixel offset of the text of `row`, below any blocks rendered above it.
    pub fn pixel_position_after_blocks_for_row(&self, row: u32) -> f64 {
        let mut pixel_position = f64::from(row) * self.default_line_height;
        if !self.is_empty() {
            pixel_position += self.tree.inclusive_total_block_pixels_preceding_row(u64::from(row));
        }
        pixel_position
    }

    /// Row containing `pixel_position`. Pixels inside a block belong to the
    /// block's anchor row.
    pub fn row_for_pixel_position(&self, pixel_position: f64) -> u32 {
        self.tree
            .row_for_pixel_position(pixel_position, self.default_line_height)
    }

    /// Give a splice boundary a real priority if it still anchors blocks,
    /// otherwise remove it.
    fn reseat_or_delete(&mut self, node: NodeId) {
        if self.tree[node].block_ids.is_empty() {
            self.tree.delete_node(node);
        } else {
            self.tree[node].priority = Some(Priority::random(&mut self.random));
            self.tree.bubble_down(node);
        }
    }

    /// Audit every structural invariant, describing the first violation.
    #[cfg(any(test, feature = "test-support"))]
    pub fn validate(&self) -> std::result::Result<(), String> {
        let Some(root) = self.tree.root else {
            if self.block_nodes.is_empty() && self.block_heights.is_empty() {
                return Ok(());
            }
            return Err(format!("empty tree but {} blocks tracked", self.block_nodes.len()));
        };
        if self.tree[root].parent.is_some() {
            return Err("root has a parent".to_string());
        }

        let mut absolute_rows: FxHashMap<NodeId, u64> = FxHashMap::default();
        let mut preorder = Vec::new();
        let mut tracked = 0;
        let mut stack = vec![(root, 0u64)];
        while let Some((id, left_ancestor_row)) = stack.pop() {
            let node = &self.tree[id];
            let row = left_ancestor_row
                .checked_add(node.distance_from_left_ancestor.rows)
                .ok_or_else(|| "absolute row overflows".to_string())?;
            absolute_rows.insert(id, row);
            preorder.push(id);

            let priority = node
                .priority
                .ok_or_else(|| format!("node at row {row} has no priority"))?;
            if node.block_ids.is_empty() {
                return Err(format!("node at row {row} anchors no blocks"));
            }

            let mut height = 0.0;
            let mut following = 0.0;
            for block in &node.block_ids {
                if self.block_nodes.get(block) != Some(&id) {
                    return Err(format!("block {block:?} at row {row} maps to another node"));
                }
                let block_height = self
                    .block_heights
                    .get(block)
                    .copied()
                    .ok_or_else(|| format!("block {block:?} has no height"))?;
                height += block_height;
                if self.following_block_ids.contains(block) {
                    following += block_height;
                }
            }
            tracked += node.block_ids.len();
            if !approx_eq(height, node.block_height) {
                return Err(format!(
                    "node at row {row} caches block height {} but anchors {height}",
                    node.block_height
                ));
            }
            if !approx_eq(following, node.following_block_height) {
                return Err(format!(
                    "node at row {row} caches following height {} but anchors {following}",
                    node.following_block_height
                ));
            }

            for (child, child_left_ancestor_row) in [(node.left, left_ancestor_row), (node.right, row)]
            {
                let Some(child) = child else {
                    continue;
                };
                if self.tree[child].parent != Some(id) {
                    return Err(format!("child of row {row} has a stale parent link"));
                }
                if self.tree.priority_of(child) < priority {
                    return Err(format!("heap order violated below row {row}"));
                }
                stack.push((child, child_left_ancestor_row));
            }
        }

        if preorder.len() != self.tree.node_count() {
            return Err(format!(
                "{} nodes reachable but {} allocated",
                preorder.len(),
                self.tree.node_count()
            ));
        }
        if tracked != self.block_nodes.len() || tracked != self.block_heights.len() {
            return Err(format!(
                "{tracked} blocks in tree, {} in node map, {} in height map",
                self.block_nodes.len(),
                self.block_heights.len()
            ));
        }
        if let Some(block) = self
            .following_block_ids
            .iter()
            .find(|block| !self.block_nodes.contains_key(*block))
        {
            return Err(format!("following block {block:?} is not tracked"));
        }

        let mut previous: Option<u64> = None;
        let mut pending = Vec::new();
        let mut current = Some(root);
        loop {
            while let Some(id) = current {
                pending.push(id);
                current = self.tree[id].left;
            }
            let Some(id) = pending.pop() else {
                break;
            };
            let row = absolute_rows[&id];
            if previous.is_some_and(|previous| previous >= row) {
                return Err(format!("rows out of order at row {row}"));
            }
            previous = Some(row);
            current = self.tree[id].right;
        }

        // Children precede parents in reverse preorder.
        let mut subtree_heights: FxHashMap<NodeId, f64> = FxHashMap::default();
        for &id in preorder.iter().rev() {
            let node = &self.tree[id];
            let left = node.left.map_or(0.0, |left| subtree_heights[&left]);
            let right = node.right.map_or(0.0, |right| subtree_heights[&right]);
            if !approx_eq(node.distance_from_left_ancestor.pixels, left + node.block_height) {
                return Err(format!(
                    "node at row {} caches {} pixels, expected {}",
                    absolute_rows[&id],
                    node.distance_from_left_ancestor.pixels,
                    left + node.block_height
                ));
            }
            subtree_heights.insert(id, left + node.block_height + right);
        }

        Ok(())
    }
}

fn ensure_valid_height(height: f64) -> Result<()> {
    ensure!(height.is_finite() && height >= 0.0, InvalidHeightSnafu { height });
    Ok(())
}

fn unknown_block(id: &impl Debug) -> Error {
    UnknownBlockSnafu {
        id: format!("{id:?}"),
    }
    .build()
}

#[cfg(any(test, feature = "test-support"))]
fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

impl<Id: BlockId> Tree<Id> {
    /// Apply a block height change to `node` and to every ancestor whose left
    /// subtree contains it.
    pub(crate) fn adjust_node_block_height(&mut self, node: NodeId, delta: f64, is_after_row: bool) {
        let target = &mut self[node];
        if is_after_row {
            target.following_block_height += delta;
        }
        target.block_height += delta;
        target.distance_from_left_ancestor.pixels += delta;

        let mut current = node;
        while let Some(parent) = self[current].parent {
            if self[parent].left == Some(current) {
                self[parent].distance_from_left_ancestor.pixels += delta;
            }
            current = parent;
        }
    }

    /// Sink a node to a leaf and unlink it.
    pub(crate) fn delete_node(&mut self, node: NodeId) {
        tracing::trace!("Tree.delete_node: {node:?}");
        self[node].priority = Some(Priority::Retired);
        self.bubble_down(node);
        match self[node].parent {
            Some(parent) if self[parent].left == Some(node) => self[parent].left = None,
            Some(parent) => self[parent].right = None,
            None => self.root = None,
        }
        self.release(node);
    }

    /// Free every node of a detached subtree, returning the blocks it anchored.
    pub(crate) fn drain_subtree(&mut self, root: NodeId) -> Vec<Id> {
        let mut ids = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.release(id);
            ids.extend(node.block_ids);
            stack.extend(node.left);
            stack.extend(node.right);
        }
        ids
    }

    pub(crate) fn bubble_up(&mut self, node: NodeId) {
        while let Some(parent) = self[node].parent {
            if self.priority_of(node) >= self.priority_of(parent) {
                break;
            }
            if self[parent].left == Some(node) {
                self.rotate_right(node);
            } else {
                self.rotate_left(node);
            }
        }
    }

    pub(crate) fn bubble_down(&mut self, node: NodeId) {
        loop {
            let priority = self.priority_of(node);
            let left = self[node].left.map(|left| (left, self.priority_of(left)));
            let right = self[node].right.map(|right| (right, self.priority_of(right)));

            match (left, right) {
                (Some((left, left_priority)), right)
                    if left_priority < priority
                        && right.map_or(true, |(_, right_priority)| left_priority < right_priority) =>
                {
                    self.rotate_right(left);
                },
                (_, Some((right, right_priority))) if right_priority < priority => {
                    self.rotate_left(right);
                },
                _ => break,
            }
        }
    }

    /// Rotate `pivot`, a right child, above its parent.
    fn rotate_left(&mut self, pivot: NodeId) {
        let root = self[pivot]
            .parent
            .expect("rotated node always has a parent");
        let grandparent = self[root].parent;
        self.replace_child(grandparent, root, pivot);
        self[pivot].parent = grandparent;

        let inner = self[pivot].left;
        self[root].right = inner;
        if let Some(inner) = inner {
            self[inner].parent = Some(root);
        }

        self[pivot].left = Some(root);
        self[root].parent = Some(pivot);

        let distance = self[root].distance_from_left_ancestor + self[pivot].distance_from_left_ancestor;
        self[pivot].distance_from_left_ancestor = distance;
    }

    /// Rotate `pivot`, a left child, above its parent.
    fn rotate_right(&mut self, pivot: NodeId) {
        let root = self[pivot]
            .parent
            .expect("rotated node always has a parent");
        let grandparent = self[root].parent;
        self.replace_child(grandparent, root, pivot);
        self[pivot].parent = grandparent;

        let inner = self[pivot].right;
        self[root].left = inner;
        if let Some(inner) = inner {
            self[inner].parent = Some(root);
        }

        self[pivot].right = Some(root);
        self[root].parent = Some(pivot);

        let distance = self[root].distance_from_left_ancestor - self[pivot].distance_from_left_ancestor;
        self[root].distance_from_left_ancestor = distance;
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            Some(parent) if self[parent].left == Some(old) => self[parent].left = Some(new),
            Some(parent) => self[parent].right = Some(new),
            None => self.root = Some(new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(default_line_height: f64) -> LineTopIndex<u32> {
        LineTopIndex::new(
            IndexConfig::default()
                .with_default_line_height(default_line_height)
                .with_seed(42),
        )
    }

    #[test]
    fn supports_opaque_block_ids() {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        struct Decoration(&'static str);

        let first = Decoration("first");
        let second = Decoration("second");
        let mut index: LineTopIndex<Decoration> =
            LineTopIndex::new(IndexConfig::default().with_default_line_height(1.0));

        index.insert_block(first.clone(), 2, 4.0, false).expect("insert");
        index.insert_block(second.clone(), 4, 7.0, true).expect("insert");
        assert_eq!(index.pixel_position_after_blocks_for_row(2), 6.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(4), 8.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(5), 16.0);

        index.remove_block(&first).expect("remove");
        assert_eq!(index.pixel_position_after_blocks_for_row(2), 2.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(4), 4.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(5), 12.0);

        index.resize_block(&second, 8.0).expect("resize");
        assert_eq!(index.pixel_position_after_blocks_for_row(2), 2.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(4), 4.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(5), 13.0);

        index.move_block(&second, 2).expect("move");
        assert_eq!(index.pixel_position_before_blocks_for_row(3), 11.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(4), 12.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(5), 13.0);
        assert_eq!(index.block_row(&second), Some(2));
        index.validate().expect("valid");
    }

    #[test]
    fn splice_reports_blocks_in_inclusive_range() {
        let mut index = index(10.0);
        for (id, row, height) in [(1, 0, 10.0), (2, 0, 20.0), (3, 1, 30.0), (4, 2, 40.0), (5, 3, 50.0), (6, 4, 60.0)]
        {
            index.insert_block(id, row, height, false).expect("insert");
        }

        let touched = index.splice(1, 2, 0);
        let expected: FxHashSet<u32> = [3, 4, 5].into_iter().collect();
        assert_eq!(touched, expected);
        index.validate().expect("valid");
        assert_eq!(index.block_row(&3), Some(1));
        assert_eq!(index.block_row(&5), Some(1));
        assert_eq!(index.block_row(&6), Some(2));

        let touched = index.splice(0, 0, 1);
        let expected: FxHashSet<u32> = [1, 2].into_iter().collect();
        assert_eq!(touched, expected);
        assert_eq!(index.block_row(&1), Some(1));
        assert_eq!(index.block_row(&3), Some(2));
        index.validate().expect("valid");
    }

    #[test]
    fn before_blocks_tracks_inserts_and_removals() {
        let mut index = index(10.0);
        index.insert_block(1, 0, 10.0, false).expect("insert");
        index.insert_block(2, 3, 20.0, false).expect("insert");
        index.insert_block(3, 5, 20.0, false).expect("insert");
        index.insert_block(4, 5, 30.0, true).expect("insert");

        assert_eq!(index.pixel_position_before_blocks_for_row(0), 0.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(1), 10.0 + 10.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(3), 30.0 + 10.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(4), 40.0 + 10.0 + 20.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(5), 50.0 + 10.0 + 20.0);
        assert_eq!(
            index.pixel_position_before_blocks_for_row(6),
            60.0 + 10.0 + 20.0 + 20.0 + 30.0
        );

        assert_eq!(index.pixel_position_after_blocks_for_row(0), 10.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(3), 30.0 + 10.0 + 20.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(5), 50.0 + 10.0 + 20.0 + 20.0);

        index.remove_block(&1).expect("remove");
        index.remove_block(&3).expect("remove");

        assert_eq!(index.pixel_position_before_blocks_for_row(1), 10.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(4), 40.0 + 20.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(5), 50.0 + 20.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(6), 60.0 + 20.0 + 30.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(5), 50.0 + 20.0);
        index.validate().expect("valid");
    }

    #[test]
    fn row_for_pixel_position_inside_blocks() {
        let mut index = index(10.0);
        index.insert_block(1, 0, 10.0, false).expect("insert");
        index.insert_block(2, 3, 20.0, false).expect("insert");
        index.insert_block(3, 5, 20.0, false).expect("insert");
        index.insert_block(4, 5, 30.0, true).expect("insert");

        assert_eq!(index.row_for_pixel_position(10.0), 0);
        assert_eq!(index.row_for_pixel_position(20.0), 1);
        assert_eq!(index.row_for_pixel_position(30.0 + 9.0), 2);
        assert_eq!(index.row_for_pixel_position(30.0 + 10.0), 3);
        assert_eq!(index.row_for_pixel_position(30.0 + 11.0), 3);
        assert_eq!(index.row_for_pixel_position(40.0 + 20.0), 3);
        assert_eq!(index.row_for_pixel_position(50.0 + 30.0 - 1.0), 4);
        assert_eq!(index.row_for_pixel_position(50.0 + 30.0), 5);
        assert_eq!(index.row_for_pixel_position(50.0 + 60.0), 5);
        assert_eq!(index.row_for_pixel_position(60.0 + 80.0), 6);

        index.remove_block(&1).expect("remove");
        index.remove_block(&3).expect("remove");

        assert_eq!(index.row_for_pixel_position(0.0), 0);
        assert_eq!(index.row_for_pixel_position(29.0), 2);
        assert_eq!(index.row_for_pixel_position(30.0), 3);
        assert_eq!(index.row_for_pixel_position(31.0), 3);
        assert_eq!(index.row_for_pixel_position(40.0 + 20.0), 4);
        assert_eq!(index.row_for_pixel_position(50.0 + 20.0), 5);
        assert_eq!(index.row_for_pixel_position(60.0 + 50.0), 6);
    }

    #[test]
    fn splice_moves_blocks_down_and_up() {
        let mut index = index(10.0);
        index.insert_block(1, 3, 20.0, false).expect("insert");
        index.insert_block(2, 5, 30.0, false).expect("insert");

        index.splice(0, 0, 4);
        index.validate().expect("valid");
        assert_eq!(index.pixel_position_before_blocks_for_row(7), 70.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(8), 80.0 + 20.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(10), 100.0 + 50.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(7), 70.0 + 20.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(9), 90.0 + 50.0);
        assert_eq!(index.row_for_pixel_position(70.0 + 20.0), 7);

        index.splice(0, 6, 2);
        index.validate().expect("valid");
        assert_eq!(index.pixel_position_before_blocks_for_row(3), 30.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(4), 40.0 + 20.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(6), 60.0 + 50.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(3), 30.0 + 20.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(5), 50.0 + 50.0);

        index.splice(2, 4, 0);
        index.validate().expect("valid");
        assert_eq!(index.block_row(&1), Some(2));
        assert_eq!(index.block_row(&2), Some(2));
        assert_eq!(index.pixel_position_before_blocks_for_row(2), 20.0);
        assert_eq!(index.pixel_position_before_blocks_for_row(3), 30.0 + 50.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(2), 20.0 + 50.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(8), 80.0 + 50.0);
        assert_eq!(index.row_for_pixel_position(20.0), 2);
        assert_eq!(index.row_for_pixel_position(80.0), 3);
    }

    #[test]
    fn splice_on_empty_index_or_empty_edit_is_noop() {
        let mut index = index(10.0);
        assert!(index.splice(0, 2, 3).is_empty());
        assert_eq!(index.pixel_position_before_blocks_for_row(13), 130.0);

        index.insert_block(1, 4, 5.0, false).expect("insert");
        assert!(index.splice(4, 0, 0).is_empty());
        assert_eq!(index.block_row(&1), Some(4));
        index.validate().expect("valid");
    }

    #[test]
    fn splice_before_blocks_only_shifts() {
        let mut index = index(10.0);
        index.insert_block(1, 10, 5.0, false).expect("insert");
        index.insert_block(2, 20, 5.0, true).expect("insert");

        let touched = index.splice(2, 3, 1);
        assert!(touched.is_empty());
        assert_eq!(index.block_row(&1), Some(8));
        assert_eq!(index.block_row(&2), Some(18));
        index.validate().expect("valid");
    }

    #[test]
    fn splice_past_last_row_saturates_reported_rows() {
        let mut index = index(10.0);
        index.insert_block(1, u32::MAX - 1, 3.0, false).expect("insert");
        index.insert_block(2, 0, 4.0, false).expect("insert");

        let touched = index.splice(0, 0, 5);
        assert_eq!(touched, [2].into_iter().collect());
        assert_eq!(index.block_row(&2), Some(5));
        assert_eq!(index.block_row(&1), Some(u32::MAX));
        index.validate().expect("valid");

        // Pushed past every nameable row
        assert_eq!(
            index.pixel_position_before_blocks_for_row(u32::MAX),
            f64::from(u32::MAX) * 10.0 + 4.0
        );
        assert_eq!(
            index.pixel_position_after_blocks_for_row(u32::MAX),
            f64::from(u32::MAX) * 10.0 + 4.0
        );
        assert_eq!(index.row_for_pixel_position(f64::MAX), u32::MAX);

        // Shrinking brings it back without losing the overflowed rows
        index.splice(0, 10, 0);
        assert_eq!(index.block_row(&2), Some(0));
        assert_eq!(index.block_row(&1), Some(u32::MAX - 6));
        assert_eq!(
            index.pixel_position_after_blocks_for_row(u32::MAX - 6),
            f64::from(u32::MAX - 6) * 10.0 + 7.0
        );
        index.validate().expect("valid");
    }

    #[test]
    fn splice_after_blocks_leaves_them_alone() {
        let mut index = index(10.0);
        index.insert_block(1, 3, 5.0, false).expect("insert");

        let touched = index.splice(10, 2, 7);
        assert!(touched.is_empty());
        assert_eq!(index.block_row(&1), Some(3));
        assert_eq!(index.len(), 1);
        index.validate().expect("valid");
    }

    #[test]
    fn insert_then_remove_restores_positions() {
        let mut index = index(12.0);
        for id in 0..20 {
            index
                .insert_block(id, id * 3, f64::from(id + 1), id % 2 == 0)
                .expect("insert");
        }
        let before: Vec<(f64, f64)> = (0..70)
            .map(|row| {
                (
                    index.pixel_position_before_blocks_for_row(row),
                    index.pixel_position_after_blocks_for_row(row),
                )
            })
            .collect();

        index.insert_block(100, 31, 44.0, true).expect("insert");
        index.remove_block(&100).expect("remove");

        let after: Vec<(f64, f64)> = (0..70)
            .map(|row| {
                (
                    index.pixel_position_before_blocks_for_row(row),
                    index.pixel_position_after_blocks_for_row(row),
                )
            })
            .collect();
        assert_eq!(before, after);
        index.validate().expect("valid");
    }

    #[test]
    fn positions_are_monotonic() {
        let mut index = index(3.0);
        for (id, row) in [(1, 0), (2, 0), (3, 4), (4, 9), (5, 9)] {
            index
                .insert_block(id, row, f64::from(id * 7), id % 2 == 1)
                .expect("insert");
        }

        for row in 0..15 {
            let before = index.pixel_position_before_blocks_for_row(row);
            let after = index.pixel_position_after_blocks_for_row(row);
            let next = index.pixel_position_before_blocks_for_row(row + 1);
            assert!(before <= after, "row {row}: {before} > {after}");
            assert!(after <= next, "row {row}: {after} > {next}");
        }
    }

    #[test]
    fn default_line_height_applies_to_later_queries() {
        let mut index = index(10.0);
        index.insert_block(1, 2, 5.0, false).expect("insert");
        assert_eq!(index.pixel_position_after_blocks_for_row(3), 35.0);

        index.set_default_line_height(20.0);
        assert_eq!(index.default_line_height(), 20.0);
        assert_eq!(index.pixel_position_after_blocks_for_row(3), 65.0);
        assert_eq!(index.row_for_pixel_position(65.0), 3);
    }

    #[test]
    fn unknown_and_duplicate_ids_are_rejected() {
        let mut index = index(10.0);
        index.insert_block(1, 2, 5.0, false).expect("insert");

        assert!(matches!(index.remove_block(&9), Err(Error::UnknownBlock { .. })));
        assert!(matches!(index.resize_block(&9, 1.0), Err(Error::UnknownBlock { .. })));
        assert!(matches!(index.move_block(&9, 1), Err(Error::UnknownBlock { .. })));
        assert!(matches!(
            index.insert_block(1, 7, 5.0, false),
            Err(Error::DuplicateBlock { .. })
        ));
        assert!(matches!(
            index.insert_block(2, 7, -1.0, false),
            Err(Error::InvalidHeight { .. })
        ));
        assert!(matches!(
            index.resize_block(&1, f64::NAN),
            Err(Error::InvalidHeight { .. })
        ));

        assert_eq!(index.len(), 1);
        assert_eq!(index.block_row(&1), Some(2));
        assert_eq!(index.block_height(&1), Some(5.0));
        index.validate().expect("valid");
    }

    #[test]
    fn removing_last_block_empties_tree() {
        let mut index = index(10.0);
        index.insert_block(1, 2, 5.0, false).expect("insert");
        index.insert_block(2, 2, 6.0, true).expect("insert");
        assert_eq!(index.is_after_row(&2), Some(true));
        assert_eq!(index.is_after_row(&1), Some(false));

        index.remove_block(&1).expect("remove");
        index.remove_block(&2).expect("remove");

        assert!(index.is_empty());
        assert_eq!(index.depth(), 0);
        assert_eq!(index.is_after_row(&2), None);
        assert_eq!(index.pixel_position_before_blocks_for_row(4), 40.0);
        index.validate().expect("valid");
    }

    #[test]
    fn empty_index_without_line_height_maps_every_pixel_to_row_zero() {
        let mut index = index(0.0);
        assert_eq!(index.row_for_pixel_position(0.0), 0);
        assert_eq!(index.row_for_pixel_position(500.0), 0);

        index.insert_block(1, 3, 5.0, false).expect("insert");
        index.remove_block(&1).expect("remove");
        assert_eq!(index.row_for_pixel_position(500.0), 0);
    }

    #[test]
    fn move_matches_remove_then_insert() {
        let mut moved = index(10.0);
        let mut reinserted = index(10.0);
        for target in [&mut moved, &mut reinserted] {
            for (id, row) in [(1, 1), (2, 5), (3, 5), (4, 12)] {
                target
                    .insert_block(id, row, f64::from(id * 10), id == 3)
                    .expect("insert");
            }
        }

        moved.move_block(&3, 9).expect("move");
        reinserted.remove_block(&3).expect("remove");
        reinserted.insert_block(3, 9, 30.0, true).expect("insert");

        for row in 0..20 {
            assert_eq!(
                moved.pixel_position_before_blocks_for_row(row),
                reinserted.pixel_position_before_blocks_for_row(row)
            );
            assert_eq!(
                moved.pixel_position_after_blocks_for_row(row),
                reinserted.pixel_position_after_blocks_for_row(row)
            );
        }
        assert_eq!(moved.is_after_row(&3), Some(true));
        moved.validate().expect("valid");
    }

    #[test]
    fn accepts_custom_random_source() {
        struct GoldenRatio(f64);

        impl RandomSource for GoldenRatio {
            fn next_f64(&mut self) -> f64 {
                self.0 = (self.0 + 0.618_033_988_75) % 1.0;
                self.0
            }
        }

        let mut index: LineTopIndex<u32, GoldenRatio> =
            LineTopIndex::with_random_source(10.0, GoldenRatio(0.0));
        for id in 0..50 {
            index.insert_block(id, id * 2, 3.0, id % 3 == 0).expect("insert");
        }
        index.validate().expect("valid");

        let touched = index.splice(10, 5, 2);
        assert_eq!(touched.len(), 3);
        assert_eq!(index.block_row(&5), Some(12));
        assert_eq!(index.block_row(&8), Some(13));
        assert_eq!(index.len(), 50);
        index.validate().expect("valid");
    }

    #[test]
    fn depth_stays_logarithmic_for_sequential_rows() {
        let mut index = index(10.0);
        let count = 10_000u32;
        for row in 0..count {
            index.insert_block(row, row, 1.0, false).expect("insert");
        }

        let bound = 4 * (f64::from(count).log2().ceil() as usize);
        assert!(index.depth() <= bound, "depth {} exceeds {bound}", index.depth());
        assert_eq!(index.pixel_position_before_blocks_for_row(count), f64::from(count) * 11.0);
    }
}
