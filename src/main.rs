//! blocklist-merger - Domain blocklist merger and IP resolver
//!
//! Builds canonical domain lists from heterogeneous blocklists and keeps
//! per-list IP ledgers up to date.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use blocklist_merger::cli::{Cli, Commands};
use blocklist_merger::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    match cli.command {
        Commands::Merge {
            input,
            output,
            workers,
            timeout,
        } => commands::merge::run(&input, &output, workers, timeout, &cli.config).await,
        Commands::Resolve {
            file,
            workers,
            timeout,
            upstream,
        } => commands::resolve::run(file, workers, timeout, upstream, &cli.config).await,
        Commands::Dedupe { file } => commands::dedupe::run(file, &cli.config).await,
        Commands::Remove {
            domain,
            from_file,
            exceptions,
            file,
        } => commands::remove::run(domain, from_file, exceptions, file, &cli.config).await,
        Commands::Ublock { file } => commands::ublock::run(file, &cli.config).await,
        Commands::Combine { output } => commands::combine::run(&output, &cli.config).await,
        Commands::Config { write } => commands::config::run(write, &cli.config).await,
        Commands::Version => {
            println!("blocklist-merger {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
