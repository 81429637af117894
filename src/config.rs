use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::marketplace::Marketplace;

/// File name of the per-repository configuration.
pub const CONFIG_FILE: &str = "content-graph.toml";

/// Configuration loaded from `content-graph.toml` at the repository root.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ContentGraphConfig {
    /// Additional path patterns to exclude from ingestion (beyond .gitignore).
    pub exclude: Option<Vec<String>>,
    /// Drop relationships that point outside the repository instead of failing the build.
    pub ignore_unresolved_references: bool,
    /// Marketplace used by `export` when none is given on the command line.
    pub marketplace: Option<Marketplace>,
}

impl ContentGraphConfig {
    /// Load configuration from `content-graph.toml` in the given root directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ContentGraphConfig::load(dir.path()), ContentGraphConfig::default());
    }

    #[test]
    fn test_parses_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "exclude = [\"Deprecated*\"]\nignore_unresolved_references = true\nmarketplace = \"marketplacev2\"\n",
        )
        .unwrap();
        let config = ContentGraphConfig::load(dir.path());
        assert_eq!(config.exclude, Some(vec!["Deprecated*".to_string()]));
        assert!(config.ignore_unresolved_references);
        assert_eq!(config.marketplace, Some(Marketplace::MarketplaceV2));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "exclude = 42").unwrap();
        assert_eq!(ContentGraphConfig::load(dir.path()), ContentGraphConfig::default());
    }
}
