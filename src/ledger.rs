//! Per-list IP ledger and the incremental merge writer.
//!
//! A ledger sits next to each domain list (`tracking.txt` -> `tracking.ip`)
//! and records every address a listed domain has resolved to:
//!
//! ```text
//! # ads.example.com
//! 203.0.113.7
//! 2001:db8::7
//! # cdn.example.net
//! 198.51.100.20
//! ```
//!
//! The file is loaded in full when a pass starts. Its trimmed lines form the
//! shadow set of known entries, which is extended in lockstep with every
//! append, so no address is ever written twice no matter how many passes
//! run or how many domains share an address. The shadow trusts the file
//! as-is: duplicated blocks already on disk are left alone.

use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::lock::LockGuard;

/// Extension used for ledger files
pub const LEDGER_EXTENSION: &str = "ip";

/// Ledger path for a domain list: the list's extension is replaced by `.ip`.
pub fn ledger_path(list: &Path) -> PathBuf {
    list.with_extension(LEDGER_EXTENSION)
}

/// Comment line opening a domain's block
pub fn domain_marker(domain: &str) -> String {
    format!("# {}", domain)
}

/// Result of merging one domain's addresses into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A block was appended holding this many new addresses.
    Appended(usize),
    /// Every address was already known.
    NoNewIps,
}

/// An open, locked ledger and its in-memory shadow.
pub struct Ledger {
    writer: BufWriter<LockGuard>,
    path: PathBuf,
    known: HashSet<String>,
    appended: usize,
}

impl Ledger {
    /// Open (creating if needed) and load the ledger at `path`.
    ///
    /// The file stays exclusively locked until the ledger is dropped or
    /// finalized.
    pub fn open(path: &Path) -> Result<Self> {
        let mut guard = LockGuard::acquire_append(path)?;
        let content = guard.read_all()?;

        let known: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let mut writer = BufWriter::new(guard);
        // A truncated last line would otherwise swallow the next marker.
        if !content.is_empty() && !content.ends_with('\n') {
            writer
                .write_all(b"\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            known,
            appended: 0,
        })
    }

    /// Whether a line (address or marker) is already recorded.
    pub fn contains(&self, entry: &str) -> bool {
        self.known.contains(entry)
    }

    /// Number of distinct non-blank lines in the shadow.
    pub fn known_entries(&self) -> usize {
        self.known.len()
    }

    /// Addresses appended since the ledger was opened.
    pub fn appended(&self) -> usize {
        self.appended
    }

    /// Append the addresses of `domain` that the ledger does not know yet.
    ///
    /// Writes `# <domain>` followed by each new address in the order given,
    /// flushes, then records the marker and the addresses in the shadow.
    /// Nothing is written when every address is already known.
    pub fn merge_and_append(&mut self, domain: &str, ips: &[IpAddr]) -> Result<MergeOutcome> {
        let mut new_ips: Vec<String> = Vec::new();
        for ip in ips.iter().map(ToString::to_string) {
            if !self.known.contains(&ip) && !new_ips.contains(&ip) {
                new_ips.push(ip);
            }
        }

        if new_ips.is_empty() {
            return Ok(MergeOutcome::NoNewIps);
        }

        let marker = domain_marker(domain);
        self.write_block(&marker, &new_ips)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;

        self.known.insert(marker);
        let count = new_ips.len();
        self.known.extend(new_ips);
        self.appended += count;

        Ok(MergeOutcome::Appended(count))
    }

    fn write_block(&mut self, marker: &str, ips: &[String]) -> std::io::Result<()> {
        writeln!(self.writer, "{}", marker)?;
        for ip in ips {
            writeln!(self.writer, "{}", ip)?;
        }
        self.writer.flush()
    }

    /// Flush and sync the ledger, releasing its lock.
    ///
    /// Returns the number of addresses appended during this pass.
    pub fn finalize(self) -> Result<usize> {
        let guard = self
            .writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        guard.sync()?;
        Ok(self.appended)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("path", &self.path)
            .field("known", &self.known.len())
            .field("appended", &self.appended)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ips(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_ledger_path() {
        assert_eq!(ledger_path(Path::new("tracking.txt")), PathBuf::from("tracking.ip"));
        assert_eq!(
            ledger_path(Path::new("/lists/malware.txt")),
            PathBuf::from("/lists/malware.ip")
        );
        assert_eq!(ledger_path(Path::new("noext")), PathBuf::from("noext.ip"));
    }

    #[test]
    fn test_open_creates_missing_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.known_entries(), 0);
        ledger.finalize().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_merge_into_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        let mut ledger = Ledger::open(&path).unwrap();
        let outcome = ledger
            .merge_and_append("foo.test", &ips(&["1.2.3.4", "5.6.7.8"]))
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Appended(2));
        assert_eq!(ledger.finalize().unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# foo.test\n1.2.3.4\n5.6.7.8\n");
    }

    #[test]
    fn test_second_pass_appends_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        for _ in 0..2 {
            let mut ledger = Ledger::open(&path).unwrap();
            ledger
                .merge_and_append("foo.test", &ips(&["1.2.3.4", "5.6.7.8"]))
                .unwrap();
            ledger.finalize().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# foo.test\n1.2.3.4\n5.6.7.8\n");
    }

    #[test]
    fn test_known_ips_skipped_within_pass() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.merge_and_append("a.test", &ips(&["1.1.1.1"])).unwrap();
        let outcome = ledger
            .merge_and_append("b.test", &ips(&["1.1.1.1", "2.2.2.2"]))
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Appended(1));
        assert_eq!(
            ledger.merge_and_append("c.test", &ips(&["2.2.2.2"])).unwrap(),
            MergeOutcome::NoNewIps
        );
        ledger.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# a.test\n1.1.1.1\n# b.test\n2.2.2.2\n");
    }

    #[test]
    fn test_existing_entries_loaded_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");
        std::fs::write(&path, "\n# old.test\n  9.9.9.9  \n\n").unwrap();

        let mut ledger = Ledger::open(&path).unwrap();
        assert!(ledger.contains("9.9.9.9"));
        assert!(ledger.contains("# old.test"));
        assert_eq!(
            ledger.merge_and_append("new.test", &ips(&["9.9.9.9"])).unwrap(),
            MergeOutcome::NoNewIps
        );
    }

    #[test]
    fn test_missing_trailing_newline_repaired_before_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");
        std::fs::write(&path, "# old.test\n9.9.9.9").unwrap();

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.merge_and_append("new.test", &ips(&["8.8.8.8"])).unwrap();
        ledger.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# old.test\n9.9.9.9\n# new.test\n8.8.8.8\n");
    }

    #[test]
    fn test_duplicate_input_ips_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        let mut ledger = Ledger::open(&path).unwrap();
        let outcome = ledger
            .merge_and_append("foo.test", &ips(&["1.2.3.4", "1.2.3.4"]))
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Appended(1));
    }

    #[test]
    fn test_ipv6_written_in_canonical_form() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        let mut ledger = Ledger::open(&path).unwrap();
        ledger
            .merge_and_append("v6.test", &ips(&["2001:0db8:0000:0000:0000:0000:0000:0001"]))
            .unwrap();
        ledger.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# v6.test\n2001:db8::1\n");
    }

    #[test]
    fn test_ledger_is_locked_while_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.ip");

        let ledger = Ledger::open(&path).unwrap();
        assert!(Ledger::open(&path).is_err());
        ledger.finalize().unwrap();
        assert!(Ledger::open(&path).is_ok());
    }
}
