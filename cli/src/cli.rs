use std::path::PathBuf;

/// Lead pipeline CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "landlead", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Pull, filter, reconcile, and rewrite the lead store
    Run(RunArgs),

    /// Pull and filter only; print counts, touch nothing
    Preview(PreviewArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Lead store directory, overrides LEAD_STORE_DIR
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub store: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct PreviewArgs {
    /// Print each surviving parcel id
    #[arg(long)]
    pub ids: bool,
}
