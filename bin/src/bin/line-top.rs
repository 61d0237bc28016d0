use clap::Parser;
use line_top_bin::{
    cli::{Cli, Command},
    commands,
};
use line_top_log::LogConfig;

fn main() {
    let cli = Cli::parse();

    let _log_guard = match line_top_log::init(LogConfig {
        log_file_path: cli.log_file,
    }) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {e}");
            None
        },
    };

    let result = match cli.command {
        Command::Fuzz(args) => commands::fuzz::handle(args),
        Command::Depth(args) => commands::depth::handle(args),
    };

    if let Err(e) = result {
        eprintln!("Command failed: {e}");
        std::process::exit(1);
    }
}
