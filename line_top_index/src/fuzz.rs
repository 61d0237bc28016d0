//! Seeded randomized comparison of [`LineTopIndex`] against
//! [`LinearLineTopIndex`].
//!
//! Each sequence draws a mix of inserts, removals, resizes, moves and splices
//! from a seeded generator and applies it to both indexes. After every step
//! the tree must pass [`LineTopIndex::validate`] and agree with the reference
//! on positions for every row up to a few rows past the last block.
use crate::{
    config::IndexConfig, error::Error, index::LineTopIndex, linear::LinearLineTopIndex,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rustc_hash::FxHashSet;
use snafu::{ResultExt, Snafu};
use std::fmt;

/// Shape of a randomized run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzConfig {
    pub sequences: usize,
    pub operations: usize,
    /// Rows are drawn from `0..row_range`.
    pub row_range: u32,
    /// Heights are drawn from `0..=max_block_height`.
    pub max_block_height: u32,
    pub default_line_height: f64,
    /// Rows past the last block checked after each step.
    pub trailing_rows: u32,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            sequences: 200,
            operations: 50,
            row_range: 100,
            max_block_height: 100,
            default_line_height: 10.0,
            trailing_rows: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert {
        id: u32,
        row: u32,
        height: f64,
        is_after_row: bool,
    },
    Remove {
        id: u32,
    },
    Resize {
        id: u32,
        height: f64,
    },
    Move {
        id: u32,
        row: u32,
    },
    Splice {
        start: u32,
        old_extent: u32,
        new_extent: u32,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert {
                id,
                row,
                height,
                is_after_row,
            } => write!(f, "insert({id}, {row}, {height}, {is_after_row})"),
            Operation::Remove { id } => write!(f, "remove({id})"),
            Operation::Resize { id, height } => write!(f, "resize({id}, {height})"),
            Operation::Move { id, row } => write!(f, "move({id}, {row})"),
            Operation::Splice {
                start,
                old_extent,
                new_extent,
            } => write!(f, "splice({start}, {old_extent}, {new_extent})"),
        }
    }
}

/// First disagreement found in a sequence. Rerunning with `seed` reproduces
/// it at `step`.
#[derive(Debug, Snafu)]
pub enum Divergence {
    #[snafu(display("seed {seed}, step {step}: {operation} was rejected"))]
    Rejected {
        seed: u64,
        step: usize,
        operation: Operation,
        source: Error,
    },

    #[snafu(display(
        "seed {seed}, step {step}, after {operation}: {query}({row}) is {actual}, expected {expected}"
    ))]
    PixelMismatch {
        seed: u64,
        step: usize,
        operation: Operation,
        query: &'static str,
        row: u32,
        expected: f64,
        actual: f64,
    },

    #[snafu(display(
        "seed {seed}, step {step}, after {operation}: row_for_pixel_position({pixel_position}) is {actual}, expected {expected}"
    ))]
    RowMismatch {
        seed: u64,
        step: usize,
        operation: Operation,
        pixel_position: f64,
        expected: u32,
        actual: u32,
    },

    #[snafu(display(
        "seed {seed}, step {step}: {operation} touched {actual:?}, expected {expected:?}"
    ))]
    TouchedMismatch {
        seed: u64,
        step: usize,
        operation: Operation,
        expected: Vec<u32>,
        actual: Vec<u32>,
    },

    #[snafu(display("seed {seed}, step {step}, after {operation}: {message}"))]
    Invariant {
        seed: u64,
        step: usize,
        operation: Operation,
        message: String,
    },
}

/// Totals for a completed sequence or run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuzzReport {
    pub sequences: usize,
    pub operations: usize,
    pub splices: usize,
    pub touched_blocks: usize,
    pub max_depth: usize,
    pub max_blocks: usize,
}

impl FuzzReport {
    fn absorb(&mut self, other: FuzzReport) {
        self.sequences += other.sequences;
        self.operations += other.operations;
        self.splices += other.splices;
        self.touched_blocks += other.touched_blocks;
        self.max_depth = self.max_depth.max(other.max_depth);
        self.max_blocks = self.max_blocks.max(other.max_blocks);
    }
}

/// Run `config.sequences` sequences seeded `base_seed`, `base_seed + 1`, ...
pub fn run(base_seed: u64, config: &FuzzConfig) -> Result<FuzzReport, Divergence> {
    let mut report = FuzzReport::default();
    for sequence in 0..config.sequences {
        let seed = base_seed.wrapping_add(sequence as u64);
        report.absorb(run_sequence(seed, config)?);
    }
    tracing::debug!(
        "fuzz: {} sequences, {} operations, {} splices, max depth {}",
        report.sequences,
        report.operations,
        report.splices,
        report.max_depth
    );
    Ok(report)
}

/// Run one seeded sequence, checking both indexes after every operation.
pub fn run_sequence(seed: u64, config: &FuzzConfig) -> Result<FuzzReport, Divergence> {
    let mut random = StdRng::seed_from_u64(seed);
    let mut actual: LineTopIndex<u32> = LineTopIndex::new(
        IndexConfig::default()
            .with_default_line_height(config.default_line_height)
            .with_seed(seed),
    );
    let mut reference = LinearLineTopIndex::new(config.default_line_height);
    let mut next_id = 1;
    let mut report = FuzzReport {
        sequences: 1,
        ..FuzzReport::default()
    };

    for step in 0..config.operations {
        let operation = next_operation(&mut random, &reference, config, &mut next_id);
        tracing::trace!("fuzz: seed={seed}, step={step}, {operation}");

        let step = Step {
            seed,
            step,
            operation,
        };
        step.apply(&mut actual, &mut reference, &mut report)?;
        step.verify(&mut random, &actual, &reference, config)?;

        report.operations += 1;
        report.max_depth = report.max_depth.max(actual.depth());
        report.max_blocks = report.max_blocks.max(actual.len());
    }
    Ok(report)
}

fn next_operation(
    random: &mut StdRng,
    reference: &LinearLineTopIndex<u32>,
    config: &FuzzConfig,
    next_id: &mut u32,
) -> Operation {
    let row_range = config.row_range.max(1);
    let kind = random.random_range(0..10);

    if kind < 3 {
        return insert_operation(random, config, next_id);
    }

    if kind >= 7 {
        let start = random.random_range(0..row_range);
        let old_extent = random_extent(random);
        let new_extent = random_extent(random);
        return Operation::Splice {
            start,
            old_extent,
            new_extent,
        };
    }

    // Edits of existing blocks become inserts until there is something to edit
    let picked = if reference.is_empty() {
        None
    } else {
        reference
            .block_ids()
            .nth(random.random_range(0..reference.len()))
            .copied()
    };
    let Some(id) = picked else {
        return insert_operation(random, config, next_id);
    };
    match kind {
        3 | 4 => Operation::Remove { id },
        5 => Operation::Resize {
            id,
            height: f64::from(random.random_range(0..=config.max_block_height)),
        },
        _ => Operation::Move {
            id,
            row: random.random_range(0..row_range),
        },
    }
}

fn insert_operation(random: &mut StdRng, config: &FuzzConfig, next_id: &mut u32) -> Operation {
    let id = *next_id;
    *next_id += 1;
    Operation::Insert {
        id,
        row: random.random_range(0..config.row_range.max(1)),
        height: f64::from(random.random_range(0..=config.max_block_height)),
        is_after_row: random.random_bool(0.5),
    }
}

/// Geometric sum of small increments, frequently zero.
fn random_extent(random: &mut StdRng) -> u32 {
    let mut extent = 0;
    while random.random_bool(0.5) {
        extent += random.random_range(0..5);
    }
    extent
}

struct Step {
    seed: u64,
    step: usize,
    operation: Operation,
}

impl Step {
    fn apply(
        &self,
        actual: &mut LineTopIndex<u32>,
        reference: &mut LinearLineTopIndex<u32>,
        report: &mut FuzzReport,
    ) -> Result<(), Divergence> {
        let result = match self.operation {
            Operation::Insert {
                id,
                row,
                height,
                is_after_row,
            } => {
                reference.insert_block(id, row, height, is_after_row);
                actual.insert_block(id, row, height, is_after_row)
            },
            Operation::Remove { id } => {
                reference.remove_block(&id);
                actual.remove_block(&id)
            },
            Operation::Resize { id, height } => {
                reference.resize_block(&id, height);
                actual.resize_block(&id, height)
            },
            Operation::Move { id, row } => {
                reference.move_block(&id, row);
                actual.move_block(&id, row)
            },
            Operation::Splice {
                start,
                old_extent,
                new_extent,
            } => {
                let expected = reference.splice(start, old_extent, new_extent);
                let touched = actual.splice(start, old_extent, new_extent);
                report.splices += 1;
                report.touched_blocks += touched.len();
                if touched != expected {
                    return TouchedMismatchSnafu {
                        seed: self.seed,
                        step: self.step,
                        operation: self.operation.clone(),
                        expected: sorted(expected),
                        actual: sorted(touched),
                    }
                    .fail();
                }
                Ok(())
            },
        };

        result.context(RejectedSnafu {
            seed: self.seed,
            step: self.step,
            operation: self.operation.clone(),
        })
    }

    fn verify(
        &self,
        random: &mut StdRng,
        actual: &LineTopIndex<u32>,
        reference: &LinearLineTopIndex<u32>,
        config: &FuzzConfig,
    ) -> Result<(), Divergence> {
        if let Err(message) = actual.validate() {
            return InvariantSnafu {
                seed: self.seed,
                step: self.step,
                operation: self.operation.clone(),
                message,
            }
            .fail();
        }

        let last_row = reference.last_row().unwrap_or(0);
        for row in 0..=last_row.saturating_add(config.trailing_rows) {
            let expected_after = reference.pixel_position_after_blocks_for_row(row);
            self.compare_pixels(
                "pixel_position_after_blocks_for_row",
                row,
                expected_after,
                actual.pixel_position_after_blocks_for_row(row),
            )?;
            self.compare_pixels(
                "pixel_position_before_blocks_for_row",
                row,
                reference.pixel_position_before_blocks_for_row(row),
                actual.pixel_position_before_blocks_for_row(row),
            )?;

            let next_after = reference.pixel_position_after_blocks_for_row(row.saturating_add(1));
            let pixel_position =
                random.random_range(expected_after as i64..=next_after as i64) as f64;
            let expected = reference.row_for_pixel_position(pixel_position);
            let found = actual.row_for_pixel_position(pixel_position);
            if found != expected {
                return RowMismatchSnafu {
                    seed: self.seed,
                    step: self.step,
                    operation: self.operation.clone(),
                    pixel_position,
                    expected,
                    actual: found,
                }
                .fail();
            }
        }
        Ok(())
    }

    fn compare_pixels(
        &self,
        query: &'static str,
        row: u32,
        expected: f64,
        actual: f64,
    ) -> Result<(), Divergence> {
        if actual == expected {
            return Ok(());
        }
        PixelMismatchSnafu {
            seed: self.seed,
            step: self.step,
            operation: self.operation.clone(),
            query,
            row,
            expected,
            actual,
        }
        .fail()
    }
}

fn sorted(ids: FxHashSet<u32>) -> Vec<u32> {
    let mut ids: Vec<u32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_reproducible() {
        let config = FuzzConfig {
            operations: 80,
            ..FuzzConfig::default()
        };

        let first = run_sequence(11, &config).expect("no divergence");
        let second = run_sequence(11, &config).expect("no divergence");
        assert_eq!(first, second);
        assert!(first.operations > 0);
    }

    #[test]
    fn operation_display_reads_like_a_call() {
        let splice = Operation::Splice {
            start: 4,
            old_extent: 2,
            new_extent: 0,
        };
        assert_eq!(splice.to_string(), "splice(4, 2, 0)");
        assert_eq!(Operation::Remove { id: 3 }.to_string(), "remove(3)");
    }

    #[test]
    fn divergence_names_seed_and_step() {
        let divergence = Divergence::RowMismatch {
            seed: 99,
            step: 7,
            operation: Operation::Move { id: 1, row: 2 },
            pixel_position: 45.0,
            expected: 4,
            actual: 3,
        };
        let message = divergence.to_string();
        assert!(message.contains("seed 99"), "{message}");
        assert!(message.contains("step 7"), "{message}");
        assert!(message.contains("move(1, 2)"), "{message}");
    }

    #[test]
    fn run_sums_sequences() {
        let config = FuzzConfig {
            sequences: 4,
            operations: 20,
            ..FuzzConfig::default()
        };

        let report = run(500, &config).expect("no divergence");
        assert_eq!(report.sequences, 4);
        assert_eq!(report.operations, 4 * 20);
    }

    #[test]
    fn every_step_applies_an_operation() {
        // Removals regularly empty the index early in a sequence
        let config = FuzzConfig {
            operations: 60,
            row_range: 2,
            ..FuzzConfig::default()
        };

        for seed in 0..25 {
            let report = run_sequence(seed, &config).expect("no divergence");
            assert_eq!(report.operations, 60, "seed {seed}");
        }
    }
}
