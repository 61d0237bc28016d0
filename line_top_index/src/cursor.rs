//! Root-to-node descents over the treap.
//!
//! Every descent carries the absolute position of the current left ancestor.
//! Adding a node's cached offset to it yields the node's absolute row together
//! with the block pixels of every node at or before it, so prefix sums never
//! have to visit a left subtree.
//!
//! ```text
//!             (row 8)            going right from row 3 folds in rows 1 and 3,
//!            /       \           going right from row 5 folds in row 5; the
//!       (row 3)    (row 12)      left subtree of row 3 is never visited when
//!       /     \                  answering "block pixels before row 6".
//!   (row 1) (row 5)
//! ```
use crate::{
    logical_position::{clamp_row, LogicalPosition},
    node::{NodeId, Tree},
};

/// How [`Tree::insert_node`] treats a node already anchored at the target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tie {
    /// Return the existing node.
    Reuse,
    /// Create a distinct node ordered after the existing one.
    Split,
}

impl<Id> Tree<Id> {
    /// Find or create the node for `row`.
    ///
    /// Returns the node and whether it was created. A created node is a leaf
    /// without a priority; the caller assigns one and rebalances.
    pub fn insert_node(&mut self, row: u64, tie: Tie) -> (NodeId, bool) {
        let Some(mut current) = self.root else {
            let id = self.alloc(LogicalPosition::new(row, 0.0), None);
            self.root = Some(id);
            return (id, true);
        };

        let mut left_ancestor_row = 0;
        loop {
            let node_row = left_ancestor_row + self[current].distance_from_left_ancestor.rows;
            let go_right = if row < node_row {
                false
            } else if row > node_row {
                true
            } else {
                match tie {
                    Tie::Reuse => return (current, false),
                    Tie::Split => true,
                }
            };

            if go_right {
                left_ancestor_row = node_row;
                match self[current].right {
                    Some(right) => current = right,
                    None => {
                        let id = self.alloc(
                            LogicalPosition::new(row - left_ancestor_row, 0.0),
                            Some(current),
                        );
                        self[current].right = Some(id);
                        return (id, true);
                    },
                }
            } else {
                match self[current].left {
                    Some(left) => current = left,
                    None => {
                        let id = self.alloc(
                            LogicalPosition::new(row - left_ancestor_row, 0.0),
                            Some(current),
                        );
                        self[current].left = Some(id);
                        return (id, true);
                    },
                }
            }
        }
    }

    /// Block pixels above the text of `row`: every block anchored before `row`
    /// plus the blocks rendered above `row` itself.
    pub fn inclusive_total_block_pixels_preceding_row(&self, row: u64) -> f64 {
        let mut left_ancestor = LogicalPosition::default();
        let mut total = 0.0;
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self[id];
            let position = left_ancestor + node.distance_from_left_ancestor;
            if row > position.rows {
                total = position.pixels;
                left_ancestor = position;
                current = node.right;
            } else if row == position.rows {
                return position.pixels - node.following_block_height;
            } else {
                current = node.left;
            }
        }
        total
    }

    /// Block pixels of every block anchored strictly before `row`.
    pub fn exclusive_total_block_pixels_preceding_row(&self, row: u64) -> f64 {
        let mut left_ancestor = LogicalPosition::default();
        let mut total = 0.0;
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self[id];
            let position = left_ancestor + node.distance_from_left_ancestor;
            if row > position.rows {
                total = position.pixels;
                left_ancestor = position;
                current = node.right;
            } else if row == position.rows {
                return position.pixels - node.block_height;
            } else {
                current = node.left;
            }
        }
        total
    }

    /// Greatest row whose blocks start at or before `pixel_position`.
    ///
    /// The descent looks for the last anchored row `r` with
    /// `r * line_height + pixels(before r) <= pixel_position`. Rows between it
    /// and the next anchored row are evenly spaced, so the answer follows by
    /// division once the descent bottoms out.
    pub fn row_for_pixel_position(&self, pixel_position: f64, default_line_height: f64) -> u32 {
        let mut left_ancestor = LogicalPosition::default();
        let mut last_anchor: Option<LogicalPosition> = None;
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self[id];
            let position = left_ancestor + node.distance_from_left_ancestor;
            let top = position.rows as f64 * default_line_height + position.pixels - node.block_height;
            if top <= pixel_position {
                last_anchor = Some(position);
                left_ancestor = position;
                current = node.right;
            } else {
                current = node.left;
            }
        }

        let (row, pixels) = match last_anchor {
            Some(anchor) => (anchor.rows, anchor.pixels),
            None if default_line_height > 0.0 => (0, 0.0),
            None => return 0,
        };

        let row = if default_line_height > 0.0 {
            let uniform = ((pixel_position - pixels) / default_line_height).floor();
            if uniform > row as f64 {
                // Saturating float-to-int cast
                uniform as u64
            } else {
                row
            }
        } else if pixel_position < pixels {
            row
        } else {
            row.saturating_add(1)
        };
        clamp_row(row)
    }
}
