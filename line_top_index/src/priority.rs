//! Treap priorities and the random source that produces them.
use rand::{Rng, RngCore};
use std::cmp::Ordering;

/// Source of uniformly distributed floats in `[0, 1)`.
///
/// Injected at construction so tests can reproduce a tree shape from a seed.
/// Every [`rand::RngCore`] is a `RandomSource`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Heap priority of a tree node. Lower priorities sit closer to the root.
///
/// The splice boundaries are pinned with dedicated variants that order below
/// every random value, and deleted nodes are retired with a variant that orders
/// above everything, so no random draw can ever collide with either.
///
/// ```text
/// SpliceEnd < SpliceStart < Random(0.0) ..= Random(<1.0) < Retired
/// ```
#[derive(Debug, Clone, Copy)]
pub(crate) enum Priority {
    /// Pinned on the end boundary of a splice; becomes the root.
    SpliceEnd,
    /// Pinned on the start boundary of a splice; sits directly below the end.
    SpliceStart,
    Random(f64),
    /// Sinks a node to a leaf so it can be detached.
    Retired,
}

impl Priority {
    pub(crate) fn random(source: &mut impl RandomSource) -> Self {
        Priority::Random(source.next_f64())
    }

    fn rank(&self) -> u8 {
        match self {
            Priority::SpliceEnd => 0,
            Priority::SpliceStart => 1,
            Priority::Random(_) => 2,
            Priority::Retired => 3,
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Priority::Random(a), Priority::Random(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}
