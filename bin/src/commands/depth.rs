use crate::cli::DepthArgs;
use line_top_index::{FxHashSet, IndexConfig, LineTopIndex};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Tree depth measured after a run of random insertions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthReport {
    pub blocks: u32,
    /// Rows that ended up anchoring at least one block.
    pub rows: usize,
    pub depth: usize,
}

impl DepthReport {
    /// Depth divided by `log2(blocks)`. A balanced treap stays around 2 to 3.
    pub fn ratio(&self) -> f64 {
        if self.blocks < 2 {
            return self.depth as f64;
        }
        self.depth as f64 / f64::from(self.blocks).log2()
    }
}

pub fn measure(blocks: u32, seed: u64) -> Result<DepthReport, line_top_index::Error> {
    let mut random = StdRng::seed_from_u64(seed);
    let mut index: LineTopIndex<u32> = LineTopIndex::new(
        IndexConfig::default()
            .with_default_line_height(1.0)
            .with_seed(seed),
    );
    let row_range = blocks.saturating_mul(4).max(1);

    for id in 0..blocks {
        let row = random.random_range(0..row_range);
        let height = f64::from(random.random_range(0..=100));
        index.insert_block(id, row, height, random.random_bool(0.5))?;
    }

    let rows = (0..blocks)
        .filter_map(|id| index.block_row(&id))
        .collect::<FxHashSet<_>>()
        .len();
    Ok(DepthReport {
        blocks,
        rows,
        depth: index.depth(),
    })
}

pub fn handle(args: DepthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let seed = super::resolve_seed(args.seed);
    let report = measure(args.blocks, seed)?;
    tracing::debug!("depth report: {report:?}");

    println!(
        "{} blocks on {} rows (seed {seed}): depth {}, {:.2} x log2(blocks)",
        report.blocks,
        report.rows,
        report.depth,
        report.ratio()
    );
    Ok(())
}
