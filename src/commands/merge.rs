//! Merge command implementation.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use super::load_config;
use crate::fetcher::{load_sources, Fetcher};
use crate::lock::LockGuard;
use crate::pipeline::{merge_lists, persist_domains};
use crate::utils::format_count;

/// Run the merge command
pub async fn run(
    input: &Path,
    output: &Path,
    workers: Option<usize>,
    timeout: Option<u64>,
    config_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;

    let workers = workers.unwrap_or(config.fetch.workers);
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.fetch_timeout());
    if workers == 0 {
        anyhow::bail!("Worker count must be at least 1");
    }
    if timeout.is_zero() {
        anyhow::bail!("Timeout must be at least 1 second");
    }

    let sources = load_sources(input)?;
    if sources.is_empty() {
        warn!("No sources listed in {}", input.display());
    }

    // Fail on an unwritable or busy output before any download starts
    drop(LockGuard::acquire_append(output)?);

    let fetcher = Fetcher::new(timeout)?
        .with_max_size(config.fetch.max_list_size);

    info!(
        "Merging {} sources ({} workers, {:?} timeout)...",
        sources.len(),
        workers,
        timeout
    );
    let (domains, summary) = merge_lists(&fetcher, &sources, workers).await;
    let written = persist_domains(output, &domains)?;

    println!();
    println!(
        "Merged {} sources ({} failed): {} domains appended to {}",
        summary.succeeded,
        summary.failed,
        format_count(written),
        output.display()
    );
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_input_is_error() {
        let dir = TempDir::new().unwrap();
        let result = run(
            &dir.path().join("absent.txt"),
            &dir.path().join("out.txt"),
            None,
            None,
            &dir.path().join("config.yaml"),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("sources.txt");
        std::fs::write(&input, "").unwrap();

        let result = run(
            &input,
            &dir.path().join("out.txt"),
            Some(0),
            None,
            &dir.path().join("config.yaml"),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_merge_local_sources_accumulates() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("hosts.txt");
        std::fs::write(
            &list,
            "0.0.0.0 ads.example.com\n||track.example.net^\n# comment\n\n",
        )
        .unwrap();
        let input = dir.path().join("sources.txt");
        std::fs::write(&input, format!("{}\n", list.display())).unwrap();
        let output = dir.path().join("out.txt");
        let config = dir.path().join("config.yaml");

        run(&input, &output, Some(2), Some(5), &config).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "ads.example.com\ntrack.example.net\n"
        );

        run(&input, &output, Some(2), Some(5), &config).await.unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap().lines().count(), 4);
    }
}
