//! # blocklist-merger - Domain Blocklist Merger and IP Resolver
//!
//! Turns many public blocklists (hosts files, Adblock filters, dnsmasq
//! rules, plain domain lists) into one canonical, sorted domain list, and
//! keeps a per-list ledger of the IP addresses those domains resolve to.
//!
//! ## Features
//!
//! - **Concurrent Fetching** - Bounded parallel downloads with per-source timeouts
//! - **Format Agnostic** - Hosts, Adblock, dnsmasq and wildcard entries normalize alike
//! - **Idempotent Ledgers** - Re-running resolution never writes an IP twice
//! - **Multi-Upstream DNS** - A/AAAA answers from every upstream are unioned
//! - **Safe Writes** - Locked appends, atomic whole-file rewrites
//! - **List Maintenance** - Dedupe, remove, uBlock export and combined list
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     blocklist-merger                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: merge, resolve, dedupe, remove, ublock...  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Workers, timeouts, upstreams, lists, exceptions      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Merge pipeline                                             │
//! │    ├── Fetcher (reqwest + rustls, Semaphore)                │
//! │    ├── Normalizer (ordered pure rules)                      │
//! │    └── DomainSet (mutex-guarded, sorted snapshot)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Resolve pipeline                                           │
//! │    ├── UpstreamResolver (hickory-proto over UDP)            │
//! │    └── Ledger (shadow set + locked appends)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use blocklist_merger::fetcher::{Fetcher, Source};
//! use blocklist_merger::pipeline::{merge_lists, persist_domains};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = Fetcher::new(Duration::from_secs(5))?;
//!     let sources = vec![Source::parse("https://example.com/hosts.txt")];
//!
//!     let (domains, _summary) = merge_lists(&fetcher, &sources, 10).await;
//!     persist_domains(Path::new("merged.txt"), &domains)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`aggregator`] - Concurrency-safe unique domain collector
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`dns`] - Multi-upstream A/AAAA resolution
//! - [`error`] - Per-upstream resolution errors
//! - [`fetcher`] - Source loading and bounded concurrent retrieval
//! - [`ledger`] - Per-list IP ledger and incremental merge writer
//! - [`lock`] - Advisory file locking for writers
//! - [`normalizer`] - Raw line to canonical domain rules
//! - [`pipeline`] - Merge and resolve pipelines
//! - [`utils`] - Common utility functions (formatting, paths)

pub mod aggregator;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dns;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod lock;
pub mod normalizer;
pub mod pipeline;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
