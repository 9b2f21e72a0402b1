//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// AlignView configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the experiment manifest
    pub manifest_path: PathBuf,

    /// Experiments root for resolving relative result paths
    pub experiments_root: PathBuf,

    /// HTTP listen address
    pub listen: String,

    /// Directory of static frontend assets, if any
    pub static_dir: Option<PathBuf>,

    /// Per-fetch timeout in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            manifest_path: crate::default_store_path().join("manifest.json"),
            experiments_root: crate::default_store_path().join("experiments"),
            listen: "127.0.0.1:8310".to_string(),
            static_dir: None,
            fetch_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| crate::Error::InvalidConfig(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(config.listen, "127.0.0.1:8310");
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = AppConfig::default();
        config.listen = "0.0.0.0:9000".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.listen, "0.0.0.0:9000");
    }
}
