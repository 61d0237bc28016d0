//! Row to pixel coordinate index for editor block decorations.
//!
//! A text view lays rows out at a uniform default line height, but blocks
//! (diagnostics, folds, inline widgets) insert extra vertical space above or
//! below specific rows. [`LineTopIndex`] answers two questions in O(log n):
//!
//! - Where does row `r` start, before and after the blocks anchored to it?
//! - Which row contains pixel offset `y`?
//!
//! while blocks are inserted, removed, resized and moved, and while the buffer
//! is edited through row [`splice`](LineTopIndex::splice)s.
//!
//! # Architecture
//!
//! ```text
//! LineTopIndex
//!   - block_nodes: FxHashMap<Id, NodeId>     (which node anchors a block)
//!   - block_heights: FxHashMap<Id, f64>
//!   - following_block_ids: FxHashSet<Id>      (blocks rendered after their row)
//!   - tree: Tree<Id>                          (treap keyed by row)
//!       nodes: Vec<Node<Id>> + free list      (arena, stable NodeId indices)
//! ```
//!
//! Each tree node stores its position *relative to its left ancestor* (the
//! nearest ancestor whose right subtree contains it) as a [`LogicalPosition`].
//! A rotation only changes the relative offset of the two nodes involved, so
//! rebalancing never has to re-walk a subtree, and a splice can shift every
//! row after the edit by relabeling a single node.
//!
//! # Usage
//!
//! ```ignore
//! let mut index = LineTopIndex::new(IndexConfig::default().with_default_line_height(20.0));
//! index.insert_block("diagnostic", 4, 36.0, true)?;
//!
//! let top = index.pixel_position_after_blocks_for_row(10);
//! let row = index.row_for_pixel_position(scroll_top);
//!
//! // Three rows were deleted starting at row 2
//! let touched = index.splice(2, 3, 0);
//! ```
mod config;
mod cursor;
mod error;
mod index;
mod logical_position;
mod node;
mod priority;

#[cfg(any(test, feature = "test-support"))]
pub mod fuzz;
#[cfg(any(test, feature = "test-support"))]
pub mod linear;

pub use config::IndexConfig;
pub use error::{Error, Result};
pub use index::{BlockId, LineTopIndex};
pub use logical_position::LogicalPosition;
pub use priority::RandomSource;
pub use rustc_hash::FxHashSet;
