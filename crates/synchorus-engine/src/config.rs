//! Dedupe run configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use synchorus_core::ScanConfig;
use synchorus_ops::CollisionPolicy;

/// Configuration for a dedupe run.
///
/// There is no default holding directory; autoclean without one is
/// rejected before the filesystem is touched.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
pub struct DedupeConfig {
    /// Where discarded duplicates are moved.
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    pub holding_dir: Option<PathBuf>,

    /// How name collisions in the holding directory are handled.
    #[serde(default)]
    pub collision: CollisionPolicy,

    /// Number of hashing threads (0 = auto-detect).
    #[serde(default)]
    pub threads: usize,

    /// Glob patterns matched against file and directory names.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Include hidden files (starting with .).
    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub include_hidden: bool,

    /// Minimum file size to consider.
    #[serde(default)]
    pub min_size: u64,

    /// Maximum depth to traverse (None = unlimited).
    #[serde(default)]
    pub max_depth: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl DedupeConfig {
    /// Create a new config builder.
    pub fn builder() -> DedupeConfigBuilder {
        DedupeConfigBuilder::default()
    }

    /// Detection-only config with scan defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the holding directory.
    pub fn with_holding_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.holding_dir = Some(dir.into());
        self
    }

    /// Set the collision policy.
    pub fn with_collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    /// Scan settings for `root`.
    ///
    /// A holding directory strictly below `root` is excluded so quarantined
    /// files are never rescanned. One at or above `root` is not excluded.
    pub fn scan_config(&self, root: &Path) -> ScanConfig {
        let mut config = ScanConfig::new(root);
        config.threads = self.threads;
        config.ignore_patterns = self.ignore_patterns.clone();
        config.include_hidden = self.include_hidden;
        config.min_size = self.min_size;
        config.max_depth = self.max_depth;
        if let Some(dir) = &self.holding_dir {
            let root = resolve_path(root);
            let holding = resolve_path(dir);
            if holding != root && holding.starts_with(&root) {
                config.exclude_paths.push(holding);
            }
        }
        config
    }
}

/// Canonical form of `path`, which need not exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing
/// components are appended to it. Paths with no resolvable ancestor come
/// back unchanged.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(mut resolved) = existing.canonicalize() {
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => return path.to_path_buf(),
        }
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            holding_dir: None,
            collision: CollisionPolicy::default(),
            threads: 0,
            ignore_patterns: Vec::new(),
            include_hidden: true,
            min_size: 0,
            max_depth: None,
        }
    }
}
