//! Dedupe command implementation.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::{join_lines, load_config, rewrite_atomic, target_lists};

/// Keep the first occurrence of every line.
///
/// Lines are compared exactly. Whitespace-only lines are always kept.
pub fn dedupe_lines(content: &str) -> (Vec<&str>, usize) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut removed = 0;

    for line in content.lines() {
        if line.trim().is_empty() || seen.insert(line) {
            kept.push(line);
        } else {
            removed += 1;
        }
    }

    (kept, removed)
}

/// Deduplicate one file in place. Returns the number of lines removed.
pub fn dedupe_file(path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let (kept, removed) = dedupe_lines(&content);

    if removed > 0 {
        rewrite_atomic(path, &join_lines(&kept))?;
    }
    Ok(removed)
}

/// Run the dedupe command
pub async fn run(file: Option<PathBuf>, config_path: &Path) -> Result<()> {
    // A single named file fails the command; in list mode each file stands alone
    if let Some(file) = file {
        let removed = dedupe_file(&file)?;
        println!("{}: removed {} duplicate lines", file.display(), removed);
        return Ok(());
    }

    let config = load_config(config_path)?;
    let mut total = 0;
    for list in target_lists(&config, None) {
        match dedupe_file(&list) {
            Ok(removed) => {
                info!("{}: removed {} duplicate lines", list.display(), removed);
                total += removed;
            }
            Err(e) => error!("{:#}", e),
        }
    }

    println!("Removed {} duplicate lines", total);
    Ok(())
}
