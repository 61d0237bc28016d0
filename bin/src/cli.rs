use clap::{Args, Parser, Subcommand};
use line_top_index::fuzz::FuzzConfig;
use std::path::PathBuf;

/// Developer tools for the line top index
#[derive(Parser)]
#[command(name = "line-top", author, version, about, long_about = None)]
pub struct Cli {
    /// Write logs to this file, or into this directory when it has no extension
    #[arg(long, global = true, env = "LINE_TOP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare the index against the linear reference on random edits
    Fuzz(FuzzArgs),
    /// Report tree depth after random insertions
    Depth(DepthArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FuzzArgs {
    /// Seed of the first sequence; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 200)]
    pub sequences: usize,

    /// Operations per sequence
    #[arg(long, default_value_t = 50)]
    pub operations: usize,

    /// Rows are drawn from `0..row_range`
    #[arg(long, default_value_t = 100)]
    pub row_range: u32,

    #[arg(long, default_value_t = 100)]
    pub max_block_height: u32,

    #[arg(long, default_value_t = 10.0)]
    pub line_height: f64,
}

impl FuzzArgs {
    pub fn config(&self) -> FuzzConfig {
        FuzzConfig {
            sequences: self.sequences,
            operations: self.operations,
            row_range: self.row_range,
            max_block_height: self.max_block_height,
            default_line_height: self.line_height,
            ..FuzzConfig::default()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DepthArgs {
    /// Number of blocks to insert
    #[arg(long, default_value_t = 100_000)]
    pub blocks: u32,

    #[arg(long)]
    pub seed: Option<u64>,
}
