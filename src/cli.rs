//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "blocklist-merger")]
#[command(author, version, about = "Domain blocklist merger and IP resolver")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch source lists and append their canonical domains to one file
    Merge {
        /// File listing one source URL or path per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (appended to)
        #[arg(short, long)]
        output: PathBuf,

        /// Concurrent downloads (default from config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-source timeout in seconds (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Resolve domain lists and merge new IPs into their .ip ledgers
    Resolve {
        /// Single list to resolve (default: every configured list)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Concurrent lookups (default from config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-query timeout in seconds (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Upstream DNS server, repeatable (default from config)
        #[arg(short, long)]
        upstream: Vec<String>,
    },

    /// Remove duplicate lines from lists
    Dedupe {
        /// Single list (default: every configured list)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Remove domains from lists
    Remove {
        /// Domain to remove, repeatable
        #[arg(short, long)]
        domain: Vec<String>,

        /// File with one domain per line to remove
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Also remove the configured exceptions
        #[arg(short, long)]
        exceptions: bool,

        /// Single list (default: every configured list)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write uBlock Origin variants (`<list>_ublock.txt`)
    Ublock {
        /// Single list (default: every configured list)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write the sorted union of every configured list
    Combine {
        /// Output file (truncated)
        #[arg(short, long, default_value = "all_lists.txt")]
        output: PathBuf,
    },

    /// Print the default configuration, or write it to the config path
    Config {
        /// Write to --config instead of printing
        #[arg(long)]
        write: bool,
    },

    /// Show version
    Version,
}
