//! Combine command implementation.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{join_lines, load_config, rewrite_atomic};
use crate::utils::{format_count, strip_scheme};

/// Add the entries of one list to `entries`.
///
/// Lines are trimmed and stripped of an http(s) scheme; blank and `#` lines
/// are skipped.
pub fn collect_entries(content: &str, entries: &mut BTreeSet<String>) {
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = strip_scheme(line);
        if !entry.is_empty() {
            entries.insert(entry.to_string());
        }
    }
}

/// Write the sorted union of `lists` to `output`, replacing it.
pub fn combine_lists(lists: &[PathBuf], output: &Path) -> Result<usize> {
    let mut entries = BTreeSet::new();
    for list in lists {
        let content = std::fs::read_to_string(list)
            .with_context(|| format!("Failed to read {}", list.display()))?;
        collect_entries(&content, &mut entries);
        info!("Parsed {}", list.display());
    }

    let entries: Vec<String> = entries.into_iter().collect();
    rewrite_atomic(output, &join_lines(&entries))?;
    Ok(entries.len())
}

/// Run the combine command
pub async fn run(output: &Path, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let count = combine_lists(&config.list_paths(Path::new("")), output)?;

    println!(
        "Wrote {} entries to {}",
        format_count(count),
        output.display()
    );
    Ok(())
}
