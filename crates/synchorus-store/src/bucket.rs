//! Bucket selection by file extension.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default bucket for files no rule matches.
pub const DEFAULT_BUCKET: &str = "files";

/// Bucket that receives video files under the built-in rules.
pub const VIDEO_BUCKET: &str = "videos";

/// Extensions routed to [`VIDEO_BUCKET`] by [`BucketSelector::default`].
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "m4v", "webm", "wmv", "flv"];

/// Maps lowercase file extensions to bucket ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSelector {
    default_bucket: String,
    rules: HashMap<String, String>,
}

impl BucketSelector {
    /// Selector with no rules; everything goes to `default_bucket`.
    pub fn new(default_bucket: impl Into<String>) -> Self {
        Self {
            default_bucket: default_bucket.into(),
            rules: HashMap::new(),
        }
    }

    /// Route `extension` (case-insensitive, leading dot optional) to `bucket`.
    pub fn with_rule(mut self, extension: &str, bucket: impl Into<String>) -> Self {
        self.rules.insert(normalize(extension), bucket.into());
        self
    }

    /// Route every known video extension to `bucket`.
    pub fn with_video_bucket(mut self, bucket: &str) -> Self {
        for ext in VIDEO_EXTENSIONS {
            self.rules.insert((*ext).to_string(), bucket.to_string());
        }
        self
    }

    /// The bucket used when no rule matches.
    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    /// Bucket id for `path`.
    pub fn select(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.rules.get(&ext.to_ascii_lowercase()))
            .map(String::as_str)
            .unwrap_or(&self.default_bucket)
    }
}

impl Default for BucketSelector {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET).with_video_bucket(VIDEO_BUCKET)
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_videos_routed_by_default() {
        let selector = BucketSelector::default();
        assert_eq!(selector.select(Path::new("clip.mp4")), "videos");
        assert_eq!(selector.select(Path::new("dir/Movie.MKV")), "videos");
        assert_eq!(selector.select(Path::new("photo.jpg")), "files");
        assert_eq!(selector.select(Path::new("README")), "files");
    }

    #[test]
    fn test_custom_rules() {
        let selector = BucketSelector::new("misc")
            .with_rule(".JPG", "photos")
            .with_rule("png", "photos");

        assert_eq!(selector.default_bucket(), "misc");
        assert_eq!(selector.select(Path::new("a.jpg")), "photos");
        assert_eq!(selector.select(Path::new("b.PNG")), "photos");
        assert_eq!(selector.select(Path::new("c.mp4")), "misc");
    }

    #[test]
    fn test_rule_overrides_video_default() {
        let selector = BucketSelector::default().with_rule("mov", "archive");
        assert_eq!(selector.select(Path::new("old.mov")), "archive");
        assert_eq!(selector.select(Path::new("new.mp4")), "videos");
    }
}
