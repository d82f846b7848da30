//! Configuration file loading.
//!
//! The file lives at `<config_dir>/synchorus/config.toml` unless `--config`
//! names another one. A missing default file yields the defaults.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::{Deserialize, Serialize};

use synchorus_engine::{CollisionPolicy, DedupeConfig};
use synchorus_store::{BucketSelector, DEFAULT_BUCKET, VIDEO_BUCKET};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Where discarded duplicates are moved.
    pub holding_dir: Option<PathBuf>,

    /// Collision handling in the holding directory.
    pub collision: CollisionPolicy,

    pub scan: ScanSection,

    pub storage: StorageSection,
}

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    /// Hashing threads (0 = auto).
    pub threads: usize,
    pub ignore_patterns: Vec<String>,
    pub include_hidden: bool,
    pub min_size: u64,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            threads: 0,
            ignore_patterns: Vec::new(),
            include_hidden: true,
            min_size: 0,
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Local object store directory.
    pub root: Option<PathBuf>,

    /// Bucket for files no extension rule matches.
    pub default_bucket: String,

    /// Extension to bucket overrides, applied on top of the video rules.
    pub buckets: BTreeMap<String, String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: None,
            default_bucket: DEFAULT_BUCKET.to_string(),
            buckets: BTreeMap::new(),
        }
    }
}

impl StorageSection {
    /// Bucket selector for this section.
    pub fn selector(&self) -> BucketSelector {
        self.buckets.iter().fold(
            BucketSelector::new(&self.default_bucket).with_video_bucket(VIDEO_BUCKET),
            |selector, (ext, bucket)| selector.with_rule(ext, bucket),
        )
    }
}

impl AppConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("synchorus").join("config.toml"))
    }

    /// Load from `path`, or from [`AppConfig::default_path`] when `None`.
    ///
    /// An explicitly named file must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                eyre!("Configuration file not found: {}", path.display())
            } else {
                eyre!(e).wrap_err(format!("Failed to read {}", path.display()))
            }
        })?;
        Self::parse(&content)
            .wrap_err_with(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Dedupe settings from this file, before command-line overrides.
    pub fn dedupe_config(&self) -> DedupeConfig {
        DedupeConfig {
            holding_dir: self.holding_dir.clone(),
            collision: self.collision,
            threads: self.scan.threads,
            ignore_patterns: self.scan.ignore_patterns.clone(),
            include_hidden: self.scan.include_hidden,
            min_size: self.scan.min_size,
            ..DedupeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert!(config.holding_dir.is_none());
        assert_eq!(config.collision, CollisionPolicy::Skip);
        assert!(config.scan.include_hidden);
        assert_eq!(config.storage.default_bucket, "files");
    }

    #[test]
    fn test_full_file() {
        let config = AppConfig::parse(
            r#"
            holding_dir = "/srv/holding"
            collision = "rename"

            [scan]
            threads = 4
            ignore_patterns = ["*.tmp", "node_modules"]
            include_hidden = false
            min_size = 1024

            [storage]
            root = "/srv/objects"
            default_bucket = "misc"

            [storage.buckets]
            jpg = "photos"
            mov = "archive"
            "#,
        )
        .unwrap();

        assert_eq!(config.holding_dir, Some(PathBuf::from("/srv/holding")));
        assert_eq!(config.collision, CollisionPolicy::Rename);

        let dedupe = config.dedupe_config();
        assert_eq!(dedupe.threads, 4);
        assert_eq!(dedupe.ignore_patterns, vec!["*.tmp", "node_modules"]);
        assert!(!dedupe.include_hidden);
        assert_eq!(dedupe.min_size, 1024);
        assert_eq!(dedupe.holding_dir, Some(PathBuf::from("/srv/holding")));

        let selector = config.storage.selector();
        assert_eq!(selector.select(Path::new("a.jpg")), "photos");
        assert_eq!(selector.select(Path::new("b.mov")), "archive");
        assert_eq!(selector.select(Path::new("c.mp4")), "videos");
        assert_eq!(selector.select(Path::new("d.txt")), "misc");
    }

    #[test]
    fn test_malformed_file_is_error() {
        assert!(AppConfig::parse("holding_dir = [").is_err());
        assert!(AppConfig::parse("collision = \"shred\"").is_err());
        assert!(AppConfig::parse("unknown_key = 1").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "holding_dir = \"/q\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.holding_dir, Some(PathBuf::from("/q")));
    }
}
