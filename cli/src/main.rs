mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{preview, run};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Preview(args) => preview::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
