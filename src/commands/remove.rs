//! Remove command implementation.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{join_lines, load_config, rewrite_atomic, target_lists};
use crate::utils::sibling_with_suffix;

/// Build the set of domains to remove.
///
/// `from_file` holds one domain per line; lines are trimmed and blank ones
/// ignored.
pub fn removal_set(
    domains: &[String],
    from_file: Option<&Path>,
    exceptions: &[String],
) -> Result<HashSet<String>> {
    let mut set: HashSet<String> = domains
        .iter()
        .chain(exceptions)
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();

    if let Some(path) = from_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        set.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    Ok(set)
}

/// Refuse a removal source that is one of the lists being edited.
pub fn check_source_not_target(from_file: &Path, targets: &[PathBuf]) -> Result<()> {
    let source = absolute(from_file);
    for target in targets {
        let ublock = sibling_with_suffix(target, "_ublock");
        if source == absolute(target) || source == absolute(&ublock) {
            anyhow::bail!(
                "Cannot use {} as source of domains to remove: it is one of the lists",
                from_file.display()
            );
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    })
}

/// Filter a list's contents.
///
/// Lines are trimmed, removed domains and blank lines are dropped, and each
/// remaining line is kept once. Section comments (`#`, not `##`) get one
/// blank line before them.
pub fn filter_list(content: &str, remove: &HashSet<String>) -> (String, usize) {
    let mut seen = HashSet::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut removed = 0;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if remove.contains(line) {
            removed += 1;
            continue;
        }
        if !seen.insert(line) {
            continue;
        }
        if line.starts_with('#') && !line.contains("##") && !lines.is_empty() {
            lines.push("");
        }
        lines.push(line);
    }

    (join_lines(&lines), removed)
}

/// Run the remove command
pub async fn run(
    domains: Vec<String>,
    from_file: Option<PathBuf>,
    exceptions: bool,
    file: Option<PathBuf>,
    config_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let targets = target_lists(&config, file);

    if let Some(source) = &from_file {
        check_source_not_target(source, &targets)?;
    }

    let exceptions: &[String] = if exceptions { &config.exceptions } else { &[] };
    let remove = removal_set(&domains, from_file.as_deref(), exceptions)?;
    if remove.is_empty() {
        anyhow::bail!("Nothing to remove: pass --domain, --from-file or --exceptions");
    }

    let mut total = 0;
    for list in &targets {
        let content = std::fs::read_to_string(list)
            .with_context(|| format!("Failed to read {}", list.display()))?;
        let (filtered, removed) = filter_list(&content, &remove);
        rewrite_atomic(list, &filtered)?;

        info!("{}: removed {} entries", list.display(), removed);
        total += removed;
    }

    println!("Removed {} entries from {} lists", total, targets.len());
    Ok(())
}
