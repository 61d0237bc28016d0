pub mod depth;
pub mod fuzz;

/// Use the given seed or draw a fresh one, logging it so the run can be repeated.
fn resolve_seed(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(rand::random);
    tracing::info!("seed {seed}");
    seed
}
