//! Reference model that stores blocks in a flat list.
//!
//! Every query scans all blocks, so it is only suitable for checking
//! [`LineTopIndex`](crate::LineTopIndex) on small inputs. Callers are trusted
//! to pass known ids; unknown ids are ignored. Rows past `u32::MAX` are kept
//! exactly and saturate when reported, as in the tree.
use crate::{index::BlockId, logical_position::clamp_row};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
struct LinearBlock<Id> {
    id: Id,
    row: u64,
    height: f64,
    is_after_row: bool,
}

#[derive(Debug, Clone)]
pub struct LinearLineTopIndex<Id> {
    default_line_height: f64,
    blocks: Vec<LinearBlock<Id>>,
}

impl<Id: BlockId> LinearLineTopIndex<Id> {
    pub fn new(default_line_height: f64) -> Self {
        Self {
            default_line_height,
            blocks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Ids in insertion order.
    pub fn block_ids(&self) -> impl Iterator<Item = &Id> + '_ {
        self.blocks.iter().map(|block| &block.id)
    }

    pub fn block_row(&self, id: &Id) -> Option<u32> {
        self.find(id).map(|block| clamp_row(block.row))
    }

    /// Greatest anchor row of any block.
    pub fn last_row(&self) -> Option<u32> {
        self.last_anchor().map(clamp_row)
    }

    pub fn insert_block(&mut self, id: Id, row: u32, height: f64, is_after_row: bool) {
        self.blocks.push(LinearBlock {
            id,
            row: u64::from(row),
            height,
            is_after_row,
        });
    }

    pub fn remove_block(&mut self, id: &Id) {
        self.blocks.retain(|block| &block.id != id);
    }

    pub fn resize_block(&mut self, id: &Id, height: f64) {
        if let Some(block) = self.blocks.iter_mut().find(|block| &block.id == id) {
            block.height = height;
        }
    }

    pub fn move_block(&mut self, id: &Id, row: u32) {
        if let Some(block) = self.blocks.iter_mut().find(|block| &block.id == id) {
            block.row = u64::from(row);
        }
    }

    pub fn splice(&mut self, start: u32, old_extent: u32, new_extent: u32) -> FxHashSet<Id> {
        let mut touched = FxHashSet::default();
        if old_extent == 0 && new_extent == 0 {
            return touched;
        }

        let start = u64::from(start);
        let old_end = start + u64::from(old_extent);
        let new_end = start + u64::from(new_extent);
        for block in &mut self.blocks {
            if block.row > old_end {
                block.row = block.row - old_end + new_end;
            } else if block.row >= start {
                block.row = new_end;
                touched.insert(block.id.clone());
            }
        }
        touched
    }

    pub fn pixel_position_before_blocks_for_row(&self, row: u32) -> f64 {
        self.before(u64::from(row))
    }

    pub fn pixel_position_after_blocks_for_row(&self, row: u32) -> f64 {
        let row = u64::from(row);
        let preceding: f64 = self
            .blocks
            .iter()
            .filter(|block| block.row == row && !block.is_after_row)
            .map(|block| block.height)
            .sum();
        self.before(row) + preceding
    }

    /// Walks rows one at a time up to the last anchor, so keep anchors small.
    pub fn row_for_pixel_position(&self, pixel_position: f64) -> u32 {
        let limit = self.last_anchor().map_or(0, |row| row + 1);
        let mut row = 0;
        while row < limit && self.before(row + 1) <= pixel_position {
            row += 1;
        }
        if row < limit || self.default_line_height <= 0.0 {
            return clamp_row(row);
        }

        // Every block precedes `limit`, so later rows are evenly spaced.
        let blocks: f64 = self.blocks.iter().map(|block| block.height).sum();
        let uniform = ((pixel_position - blocks) / self.default_line_height).floor();
        if uniform > limit as f64 {
            clamp_row(uniform as u64)
        } else {
            clamp_row(limit)
        }
    }

    fn before(&self, row: u64) -> f64 {
        let blocks: f64 = self
            .blocks
            .iter()
            .filter(|block| block.row < row)
            .map(|block| block.height)
            .sum();
        row as f64 * self.default_line_height + blocks
    }

    fn last_anchor(&self) -> Option<u64> {
        self.blocks.iter().map(|block| block.row).max()
    }

    fn find(&self, id: &Id) -> Option<&LinearBlock<Id>> {
        self.blocks.iter().find(|block| &block.id == id)
    }
}
