//! The two concurrent pipelines.
//!
//! - [`merge_lists`]: fetch every source, normalize each line inside the
//!   fetch callback and collect the survivors in a run-owned [`DomainSet`].
//!   [`persist_domains`] then appends the sorted snapshot to the output.
//! - [`resolve_list`]: one pass over a domain list. Domains are resolved in
//!   parallel behind a semaphore; each answer is merged into the list's
//!   [`Ledger`] under a mutex, so the diff-append-shadow step never
//!   interleaves.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info};

use crate::aggregator::DomainSet;
use crate::dns::HostResolver;
use crate::fetcher::{FetchSummary, Fetcher, Source};
use crate::ledger::{ledger_path, Ledger, MergeOutcome};
use crate::lock::LockGuard;
use crate::normalizer::normalize;
use crate::utils::format_count;

/// Fetch, normalize and aggregate every source.
///
/// Returns the sorted canonical domains and the fetch counts. Completes only
/// after every fetch task has terminated.
pub async fn merge_lists(
    fetcher: &Fetcher,
    sources: &[Source],
    concurrency: usize,
) -> (Vec<String>, FetchSummary) {
    let domains = Arc::new(DomainSet::new());
    let sink = Arc::clone(&domains);

    let summary = fetcher
        .fetch_all(sources, concurrency, move |line| match normalize(line) {
            Some(domain) => sink.add(domain),
            None => debug!("Rejected line: {:?}", line),
        })
        .await;

    let snapshot = domains.snapshot();
    info!(
        "Collected {} unique domains from {} lines",
        format_count(snapshot.len()),
        format_count(summary.lines)
    );
    (snapshot, summary)
}

/// Append `domains` to `output`, one per line.
///
/// The file is opened in append mode and locked for the duration of the
/// write. Returns the number of lines written.
pub fn persist_domains(output: &Path, domains: &[String]) -> Result<usize> {
    let guard = LockGuard::acquire_append(output)?;
    let mut writer = BufWriter::new(guard);

    for domain in domains {
        writeln!(writer, "{}", domain)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    let guard = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {}", output.display()))?;
    guard.sync()?;

    Ok(domains.len())
}

/// Read the domains of a list file, creating it empty when missing.
///
/// Lines are trimmed; blank and `#` lines are skipped. A domain listed twice
/// is returned once, at its first position.
pub fn read_domain_list(list: &Path) -> Result<Vec<String>> {
    if !list.exists() {
        info!("{} does not exist, creating it empty", list.display());
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(list)
            .with_context(|| format!("Failed to create {}", list.display()))?;
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(list)
        .with_context(|| format!("Failed to read {}", list.display()))?;

    let mut seen = HashSet::new();
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect())
}

/// Counts from one resolution pass over a list
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub list: PathBuf,
    pub ledger: PathBuf,
    /// Distinct domains in the list
    pub domains: usize,
    /// Domains with at least one address
    pub resolved: usize,
    /// Domains no upstream answered for
    pub no_answer: usize,
    /// Resolved domains whose addresses were all known already
    pub no_new_ips: usize,
    /// Addresses appended to the ledger
    pub appended: usize,
}

enum DomainOutcome {
    NoAnswer,
    Merged(MergeOutcome),
}

/// Resolve every domain of `list` and merge new addresses into its ledger.
///
/// At most `workers` lookups run at once. The ledger is loaded before the
/// first lookup and finalized after the last task joined. Per-domain lookup
/// failures are absorbed; a failed ledger write fails the pass once every
/// task has finished.
pub async fn resolve_list(
    list: &Path,
    resolver: Arc<dyn HostResolver>,
    workers: usize,
) -> Result<PassReport> {
    let domains = read_domain_list(list)?;
    let ledger_file = ledger_path(list);
    let ledger = Arc::new(Mutex::new(Ledger::open(&ledger_file)?));

    info!(
        "Resolving {} domains from {}",
        format_count(domains.len()),
        list.display()
    );

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(domains.len());

    for domain in domains {
        let semaphore = Arc::clone(&semaphore);
        let resolver = Arc::clone(&resolver);
        let ledger = Arc::clone(&ledger);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .context("Admission gate closed")?;

            let ips = resolver.resolve(&domain).await;
            if ips.is_empty() {
                debug!("No answer for {}", domain);
                return Ok::<_, anyhow::Error>(DomainOutcome::NoAnswer);
            }

            // File writes stay off the async workers
            let merge_domain = domain.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                ledger.blocking_lock().merge_and_append(&merge_domain, &ips)
            })
            .await
            .context("Ledger merge task failed")??;
            match outcome {
                MergeOutcome::Appended(count) => debug!("{}: {} new IPs", domain, count),
                MergeOutcome::NoNewIps => debug!("{}: no new IPs", domain),
            }
            Ok(DomainOutcome::Merged(outcome))
        }));
    }

    let mut report = PassReport {
        list: list.to_path_buf(),
        ledger: ledger_file,
        domains: handles.len(),
        ..PassReport::default()
    };
    let mut first_error = None;

    for handle in handles {
        match handle.await {
            Ok(Ok(DomainOutcome::NoAnswer)) => report.no_answer += 1,
            Ok(Ok(DomainOutcome::Merged(MergeOutcome::Appended(_)))) => report.resolved += 1,
            Ok(Ok(DomainOutcome::Merged(MergeOutcome::NoNewIps))) => {
                report.resolved += 1;
                report.no_new_ips += 1;
            }
            Ok(Err(e)) => {
                error!("{:#}", e);
                first_error.get_or_insert(e);
            }
            Err(e) => error!("Resolve task failed: {}", e),
        }
    }

    let ledger = Arc::try_unwrap(ledger)
        .map_err(|_| anyhow::anyhow!("Ledger still shared after all tasks joined"))?
        .into_inner();
    report.appended = tokio::task::spawn_blocking(move || ledger.finalize())
        .await
        .context("Ledger finalize task failed")??;

    if let Some(e) = first_error {
        return Err(e);
    }

    info!(
        "{}: {} resolved, {} without answer, {} new IPs",
        report.list.display(),
        format_count(report.resolved),
        format_count(report.no_answer),
        format_count(report.appended)
    );

    Ok(report)
}
