//! uBlock Origin export.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{load_config, rewrite_atomic, target_lists};
use crate::utils::sibling_with_suffix;

/// Convert one list line to uBlock filter syntax.
///
/// Comments switch to `!`, blank lines pass through and domains become
/// `||domain^`.
pub fn to_ublock_line(line: &str) -> String {
    if line.starts_with('#') {
        line.replace('#', "!")
    } else if line.trim().is_empty() {
        String::new()
    } else {
        format!("||{}^", line.trim_end())
    }
}

/// Write `<stem>_ublock.txt` next to `list`. Returns the output path.
pub fn export_list(list: &Path) -> Result<PathBuf> {
    let content = std::fs::read_to_string(list)
        .with_context(|| format!("Failed to read {}", list.display()))?;

    let mut out = String::with_capacity(content.len() + content.len() / 4);
    for line in content.lines() {
        out.push_str(&to_ublock_line(line));
        out.push('\n');
    }

    let target = sibling_with_suffix(list, "_ublock");
    rewrite_atomic(&target, &out)?;
    Ok(target)
}

/// Run the ublock command
pub async fn run(file: Option<PathBuf>, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    for list in target_lists(&config, file) {
        let target = export_list(&list)?;
        info!("Created {}", target.display());
    }

    println!("Done");
    Ok(())
}
