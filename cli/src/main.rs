mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{islands, nodes, run, segments};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::MakeNodes(args) => nodes::run(&cli, args),
        Commands::AnalyzeSegments(args) => segments::run(&cli, args),
        Commands::IdentifyIslands(args) => islands::run(&cli, args),
        Commands::RunAll(args) => run::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
