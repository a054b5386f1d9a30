//! CLI command implementations.

pub mod combine;
pub mod config;
pub mod dedupe;
pub mod merge;
pub mod remove;
pub mod resolve;
pub mod ublock;

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::lock::LockGuard;

/// Load the config at `path`, or defaults when the file does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("Failed to load config from {:?}", path))
}

/// The single list given on the command line, or every configured list
pub fn target_lists(config: &Config, file: Option<PathBuf>) -> Vec<PathBuf> {
    match file {
        Some(file) => vec![file],
        None => config.list_paths(Path::new("")),
    }
}

/// Replace the contents of `path` atomically.
///
/// The target stays locked while the new contents are written to a
/// temporary file in the same directory and renamed over it.
pub fn rewrite_atomic(path: &Path, content: &str) -> Result<()> {
    let _guard = LockGuard::acquire(path)?;

    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("Failed to create temporary file for {}", path.display()))?;
    temp_file
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    temp_file
        .as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// Join lines with `\n`, ending with a newline unless empty
pub(crate) fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}
