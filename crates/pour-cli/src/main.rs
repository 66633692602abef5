//! pour - install prebuilt binaries from checksummed formulas

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pour_cli::cmd;
use pour_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    match &cli.command {
        Commands::Install { formulas } => cmd::install::install(formulas, cli.layout()?, quiet).await,
        Commands::Test { formula } => cmd::test::test(formula, &cli.layout()?, quiet).await,
        Commands::Check { formulas } => cmd::check::check(formulas),
        Commands::Hash { files } => cmd::hash::hash(files),
        Commands::Info { formula } => cmd::info::info(formula, &cli.layout()?),
    }
}
