//! Config command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;

/// Print the default configuration, or write it to `config_path`.
///
/// Writing never overwrites an existing file.
pub async fn run(write: bool, config_path: &Path) -> Result<()> {
    if !write {
        print!("{}", Config::generate_default_yaml());
        return Ok(());
    }

    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }
    Config::default().save(config_path)?;
    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_default_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocklist-merger.yaml");

        run(true, &path).await.unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        assert!(run(true, &path).await.is_err());
    }
}
