//! Configuration management for blocklist-merger.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::dns::{self, parse_upstreams};
use crate::fetcher;

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "blocklist-merger.yaml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source download settings
    pub fetch: FetchConfig,

    /// DNS resolution settings
    pub resolve: ResolveConfig,

    /// Domain lists processed when no single file is given
    pub lists: Vec<String>,

    /// Domains that must never stay in a list (`remove --exceptions`)
    pub exceptions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            resolve: ResolveConfig::default(),
            lists: default_lists(),
            exceptions: vec!["youtube.com".to_string()],
        }
    }
}

/// Source download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Concurrent downloads
    pub workers: usize,
    /// Per-source timeout
    pub timeout_secs: u64,
    /// Largest accepted list body in bytes
    pub max_list_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: fetcher::DEFAULT_WORKERS,
            timeout_secs: fetcher::DEFAULT_TIMEOUT_SECS,
            max_list_size: fetcher::MAX_LIST_SIZE,
        }
    }
}

/// DNS resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Domains resolved concurrently
    pub workers: usize,
    /// Per-query timeout
    pub timeout_secs: u64,
    /// Upstream servers, `ip:port` or bare `ip` (port 53)
    pub upstreams: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            timeout_secs: dns::DEFAULT_TIMEOUT_SECS,
            upstreams: dns::DEFAULT_UPSTREAMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn default_lists() -> Vec<String> {
    [
        "advertisement.txt",
        "csam.txt",
        "fingerprinting.txt",
        "forums.txt",
        "malware.txt",
        "phishing.txt",
        "porn.txt",
        "spam.txt",
        "suspicious.txt",
        "telemetry.txt",
        "to_monitor.txt",
        "tracking.txt",
        "zoophilia.txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to built-in defaults.
    ///
    /// A file that exists but cannot be parsed or validated is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            debug!("No config at {:?}, using defaults", path.as_ref());
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetch.workers == 0 {
            anyhow::bail!("fetch.workers must be at least 1");
        }
        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be at least 1");
        }
        if self.fetch.max_list_size == 0 {
            anyhow::bail!("fetch.max_list_size must be greater than 0");
        }
        if self.resolve.workers == 0 {
            anyhow::bail!("resolve.workers must be at least 1");
        }
        if self.resolve.timeout_secs == 0 {
            anyhow::bail!("resolve.timeout_secs must be at least 1");
        }
        if self.resolve.upstreams.is_empty() {
            anyhow::bail!("resolve.upstreams must name at least one DNS server");
        }
        parse_upstreams(&self.resolve.upstreams)?;

        for list in &self.lists {
            if !list.ends_with(".txt") {
                anyhow::bail!("List '{}' must be a .txt file", list);
            }
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    ///
    /// Uses tempfile + rename pattern to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        let parent_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;
        temp_file
            .write_all(content.as_bytes())
            .context("Failed to write config")?;
        temp_file.flush().context("Failed to flush config")?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to save config to {:?}", path))?;

        Ok(())
    }

    /// Default configuration rendered as YAML
    pub fn generate_default_yaml() -> String {
        serde_yaml::to_string(&Config::default()).unwrap_or_default()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve.timeout_secs)
    }

    pub fn upstream_addrs(&self) -> Result<Vec<SocketAddr>> {
        parse_upstreams(&self.resolve.upstreams)
    }

    /// Default list files, relative to `dir`
    pub fn list_paths(&self, dir: &Path) -> Vec<PathBuf> {
        self.lists.iter().map(|list| dir.join(list)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fetch.workers, 10);
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.resolve.workers, 20);
        assert_eq!(config.resolve.timeout_secs, 3);
        assert_eq!(config.resolve.upstreams.len(), 3);
        assert!(config.lists.contains(&"tracking.txt".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "resolve:\n  workers: 5\nlists:\n  - custom.txt\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.resolve.workers, 5);
        assert_eq!(config.resolve.timeout_secs, 3);
        assert_eq!(config.fetch.workers, 10);
        assert_eq!(config.lists, vec!["custom.txt"]);
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = Config::default();
        config.fetch.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.resolve.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_upstreams() {
        let mut config = Config::default();
        config.resolve.upstreams = vec!["dns.example".to_string()];
        assert!(config.validate().is_err());

        config.resolve.upstreams.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_txt_lists() {
        let mut config = Config::default();
        config.lists = vec!["tracking.ip".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "fetch: [not, a, map]").unwrap();
        assert!(Config::load_or_default(&path).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.exceptions.push("example.org".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_list_paths() {
        let mut config = Config::default();
        config.lists = vec!["a.txt".to_string(), "b.txt".to_string()];
        assert_eq!(
            config.list_paths(Path::new("/srv")),
            vec![PathBuf::from("/srv/a.txt"), PathBuf::from("/srv/b.txt")]
        );
    }

    #[test]
    fn test_generate_default_yaml_parses() {
        let yaml = Config::generate_default_yaml();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
