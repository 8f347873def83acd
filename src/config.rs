//! @ai:module:intent Configuration for locating intent documents and resolving them
//! @ai:module:layer infrastructure
//! @ai:module:public_api Config
//! @ai:module:depends_on resolver, manifest, error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::manifest::EntryPolicy;
use crate::resolver::HashPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "intent.toml";

/// @ai:intent Settings read from `intent.toml`, every field optional
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_intent_dir")]
    pub intent_dir: PathBuf,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub hash_policy: HashPolicy,
    #[serde(default)]
    pub entry_policy: EntryPolicy,
    #[serde(default)]
    pub stale_is_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intent_dir: default_intent_dir(),
            manifest: default_manifest(),
            lang: None,
            hash_policy: HashPolicy::default(),
            entry_policy: EntryPolicy::default(),
            stale_is_error: false,
        }
    }
}

fn default_intent_dir() -> PathBuf {
    PathBuf::from(".intent")
}

fn default_manifest() -> String {
    "manifest.yaml".to_string()
}

impl Config {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// @ai:intent Load `intent.toml` from the repository root when present, defaults otherwise
    /// @ai:effects fs:read
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading configuration");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.intent_dir, PathBuf::from(".intent"));
        assert_eq!(config.manifest, "manifest.yaml");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "lang = \"fr\"\nhash_policy = \"normalized\"\nentry_policy = \"strict\"\n",
        )
        .unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.lang.as_deref(), Some("fr"));
        assert_eq!(config.hash_policy, HashPolicy::Normalized);
        assert_eq!(config.entry_policy, EntryPolicy::Strict);
        assert_eq!(config.intent_dir, PathBuf::from(".intent"));
        assert!(!config.stale_is_error);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "hash_policy = \"sometimes\"\n").unwrap();

        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::Config { .. })
        ));
    }
}
