//! Name collisions inside the holding directory.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The kind of collision encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
    /// Source and destination are the same path.
    SameFile,
    /// The source path has no final component to move by.
    NoFileName,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists in holding directory"),
            Self::DirectoryExists => write!(f, "Directory already exists in holding directory"),
            Self::SameFile => write!(f, "Source is already in the holding directory"),
            Self::NoFileName => write!(f, "Path has no file name"),
        }
    }
}

/// What to do when the holding directory already has an entry with the
/// discarded file's base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Leave the source in place and report the move as failed.
    #[default]
    Skip,
    /// Move under a free name: "file (1).txt", "file (2).txt", ...
    #[serde(alias = "autorename")]
    Rename,
    /// Replace the existing file.
    Overwrite,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Rename => write!(f, "rename"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "rename" | "autorename" => Ok(Self::Rename),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("unknown collision policy: {other}")),
        }
    }
}

/// Generate a free path next to `path` by appending a counter.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc. Names that are
/// not valid UTF-8 keep their original bytes.
pub fn auto_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().unwrap_or_default();
    let extension = path.extension();

    for i in 1..10_000 {
        let new_path = parent.join(suffixed_name(stem, &format!(" ({i})"), extension));
        if !exists_no_follow(&new_path) {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    parent.join(suffixed_name(stem, &format!("_{timestamp}"), extension))
}

/// `stem` + `suffix` + `.extension`.
fn suffixed_name(stem: &OsStr, suffix: &str, extension: Option<&OsStr>) -> OsString {
    let mut name = stem.to_os_string();
    name.push(suffix);
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Like `Path::exists`, but a dangling symlink counts as present.
pub(crate) fn exists_no_follow(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
