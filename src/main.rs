//! Main entry point for the pbix-inspect CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pbix_inspect::{Cli, PbixInspector};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the listing on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let inspector = PbixInspector::new(&cli.file)?;

    if cli.names_only {
        for entry in inspector.list_contents()? {
            println!("{}", entry.name);
        }
    } else {
        inspector.print_contents()?;
    }

    Ok(())
}
