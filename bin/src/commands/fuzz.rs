use crate::cli::FuzzArgs;
use line_top_index::fuzz;

pub fn handle(args: FuzzArgs) -> Result<(), Box<dyn std::error::Error>> {
    let seed = super::resolve_seed(args.seed);
    let config = args.config();

    match fuzz::run(seed, &config) {
        Ok(report) => {
            println!(
                "{} sequences from seed {seed}: {} operations, {} splices touching {} blocks",
                report.sequences, report.operations, report.splices, report.touched_blocks
            );
            println!(
                "largest index: {} blocks, depth {}",
                report.max_blocks, report.max_depth
            );
            Ok(())
        },
        Err(divergence) => {
            tracing::error!("{divergence}");
            Err(divergence.into())
        },
    }
}
