//! Common utility functions used across modules.
//!
//! - [`format_count`] - Format counts with K/M suffix (1.5K, 2.3M)
//! - [`format_bytes`] - Format byte sizes (KB, MB, GB)
//! - [`sibling_with_suffix`] - Derive `<stem><suffix>.<ext>` next to a list
//! - [`strip_scheme`] - Drop a leading `http://` or `https://`

use std::path::{Path, PathBuf};

/// Format a count with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use blocklist_merger::utils::format_count;
/// assert_eq!(format_count(500), "500");
/// assert_eq!(format_count(1500), "1.5K");
/// assert_eq!(format_count(1_500_000), "1.5M");
/// ```
pub fn format_count(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Format bytes in human-readable form (KB, MB, GB).
///
/// # Examples
/// ```
/// use blocklist_merger::utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1_500_000), "1.4 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Path next to `list` named `<stem><suffix>` with the same extension.
///
/// # Examples
/// ```
/// use blocklist_merger::utils::sibling_with_suffix;
/// use std::path::{Path, PathBuf};
/// assert_eq!(
///     sibling_with_suffix(Path::new("lists/spam.txt"), "_ublock"),
///     PathBuf::from("lists/spam_ublock.txt")
/// );
/// ```
pub fn sibling_with_suffix(list: &Path, suffix: &str) -> PathBuf {
    let stem = list
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match list.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    list.with_file_name(name)
}

/// Remove a leading `http://` or `https://` from an entry.
pub fn strip_scheme(entry: &str) -> &str {
    entry
        .strip_prefix("https://")
        .or_else(|| entry.strip_prefix("http://"))
        .unwrap_or(entry)
}
