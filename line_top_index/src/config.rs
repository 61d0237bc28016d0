/// Construction parameters for [`LineTopIndex::new`](crate::LineTopIndex::new).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndexConfig {
    /// Height of a row without blocks, in pixels.
    pub default_line_height: f64,
    /// Seed for treap priorities. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl IndexConfig {
    pub fn with_default_line_height(mut self, default_line_height: f64) -> Self {
        self.default_line_height = default_line_height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
