//! Resolve command implementation.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::{load_config, target_lists};
use crate::dns::{parse_upstreams, HostResolver, UpstreamResolver};
use crate::pipeline::resolve_list;
use crate::utils::format_count;

/// Sums over every pass of one resolve run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTotals {
    pub lists: usize,
    pub failed: usize,
    pub domains: usize,
    pub appended: usize,
}

/// Run one pass per list, in order.
///
/// With `keep_going`, a failed pass is logged and the next list still runs;
/// otherwise the first failure is returned.
pub async fn resolve_lists(
    lists: &[PathBuf],
    resolver: Arc<dyn HostResolver>,
    workers: usize,
    keep_going: bool,
) -> Result<ResolveTotals> {
    let mut totals = ResolveTotals::default();

    for list in lists {
        match resolve_list(list, Arc::clone(&resolver), workers).await {
            Ok(report) => {
                totals.lists += 1;
                totals.domains += report.domains;
                totals.appended += report.appended;
            }
            Err(e) if keep_going => {
                error!("{}: {:#}", list.display(), e);
                totals.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(totals)
}

/// Run the resolve command
pub async fn run(
    file: Option<PathBuf>,
    workers: Option<usize>,
    timeout: Option<u64>,
    upstream: Vec<String>,
    config_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;

    let workers = workers.unwrap_or(config.resolve.workers);
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.resolve_timeout());
    if workers == 0 {
        anyhow::bail!("Worker count must be at least 1");
    }
    if timeout.is_zero() {
        anyhow::bail!("Timeout must be at least 1 second");
    }

    let upstreams = if upstream.is_empty() {
        config.upstream_addrs()?
    } else {
        parse_upstreams(&upstream)?
    };
    let resolver = UpstreamResolver::new(upstreams, timeout)?;
    info!(
        "Using {} upstreams, {} workers, {:?} timeout",
        resolver.upstreams().len(),
        workers,
        timeout
    );
    let resolver: Arc<dyn HostResolver> = Arc::new(resolver);

    // A single named list fails the command; in list mode each list stands alone
    let keep_going = file.is_none();
    let totals = resolve_lists(
        &target_lists(&config, file),
        resolver,
        workers,
        keep_going,
    )
    .await?;

    println!();
    println!(
        "Resolved {} domains in {} lists ({} failed): {} new IPs",
        format_count(totals.domains),
        totals.lists,
        totals.failed,
        format_count(totals.appended)
    );
    println!();

    Ok(())
}
