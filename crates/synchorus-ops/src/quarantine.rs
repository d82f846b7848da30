//! Relocation of discarded duplicates into the holding directory.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use synchorus_core::{FileRecord, Relocation, RelocationFailure};

use crate::conflict::{CollisionPolicy, ConflictKind, auto_rename_path, exists_no_follow};

/// Errors that prevent any relocation from happening.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// The holding path exists but is not a directory.
    #[error("Holding path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The holding directory could not be created.
    #[error("Cannot create holding directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of relocating a batch of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelocationReport {
    /// Files that were moved.
    pub relocations: Vec<Relocation>,
    /// Files that stayed where they were.
    pub failures: Vec<RelocationFailure>,
}

impl RelocationReport {
    /// Number of files successfully moved.
    pub fn removed_count(&self) -> usize {
        self.relocations.len()
    }

    /// Check if every move succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: RelocationReport) {
        self.relocations.extend(other.relocations);
        self.failures.extend(other.failures);
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("Quarantined {} files", self.relocations.len())
        } else {
            format!(
                "Quarantined {} files, {} failed",
                self.relocations.len(),
                self.failures.len()
            )
        }
    }
}

/// Moves files into a holding directory instead of deleting them.
#[derive(Debug, Clone)]
pub struct Quarantine {
    holding_dir: PathBuf,
    policy: CollisionPolicy,
}

impl Quarantine {
    /// Create a quarantine targeting `holding_dir`.
    pub fn new(holding_dir: impl Into<PathBuf>) -> Self {
        Self {
            holding_dir: holding_dir.into(),
            policy: CollisionPolicy::default(),
        }
    }

    /// Set how name collisions in the holding directory are handled.
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The holding directory.
    pub fn holding_dir(&self) -> &Path {
        &self.holding_dir
    }

    /// The active collision policy.
    pub fn collision_policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Make sure the holding directory exists.
    pub fn prepare(&self) -> Result<(), QuarantineError> {
        if self.holding_dir.exists() {
            if !self.holding_dir.is_dir() {
                return Err(QuarantineError::NotADirectory {
                    path: self.holding_dir.clone(),
                });
            }
            return Ok(());
        }

        fs::create_dir_all(&self.holding_dir).map_err(|source| QuarantineError::Create {
            path: self.holding_dir.clone(),
            source,
        })?;
        info!(path = %self.holding_dir.display(), "created holding directory");
        Ok(())
    }

    /// Move every record into the holding directory, one at a time.
    ///
    /// A failed move is logged and skipped; the source file is left
    /// exactly where it was.
    pub fn relocate(&self, discard: &[FileRecord]) -> RelocationReport {
        let mut report = RelocationReport::default();

        for record in discard {
            match self.relocate_one(&record.path) {
                Ok(to) => {
                    info!(from = %record.path.display(), to = %to.display(), "quarantined");
                    report.relocations.push(Relocation {
                        from: record.path.clone(),
                        to,
                    });
                }
                Err(failure) => {
                    warn!(
                        path = %failure.path.display(),
                        reason = %failure.message,
                        "failed to quarantine, leaving in place"
                    );
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    fn relocate_one(&self, source: &Path) -> Result<PathBuf, RelocationFailure> {
        let fail = |destination: &Path, message: String| RelocationFailure {
            path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            message,
        };

        let Some(name) = source.file_name() else {
            let message = ConflictKind::NoFileName.to_string();
            return Err(fail(&self.holding_dir, message));
        };
        let dest = self.holding_dir.join(name);

        if dest == source {
            return Err(fail(&dest, ConflictKind::SameFile.to_string()));
        }

        let final_dest = if exists_no_follow(&dest) {
            if dest.is_dir() {
                return Err(fail(&dest, ConflictKind::DirectoryExists.to_string()));
            }
            match self.policy {
                CollisionPolicy::Skip => {
                    return Err(fail(&dest, ConflictKind::FileExists.to_string()));
                }
                CollisionPolicy::Rename => {
                    let renamed = auto_rename_path(&dest);
                    debug!(to = %renamed.display(), "name taken in holding directory, renaming");
                    renamed
                }
                CollisionPolicy::Overwrite => {
                    debug!(to = %dest.display(), "overwriting existing entry in holding directory");
                    dest
                }
            }
        } else {
            dest
        };

        move_file(source, &final_dest).map_err(|e| fail(&final_dest, e.to_string()))?;
        Ok(final_dest)
    }
}

/// Move a single file.
///
/// Tries a rename first; across filesystems falls back to [`copy_across`].
fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %source.display(), "cross-device move, copying");
            copy_across(source, dest)
        }
        Err(e) => Err(e),
    }
}

/// Copy `source` to `dest`, then remove `source`.
///
/// The data is written to a hidden partial file next to `dest` and renamed
/// into place once complete. On any failure `dest` and the partial file are
/// removed again and `source` is left untouched.
fn copy_across(source: &Path, dest: &Path) -> io::Result<()> {
    let partial = partial_path(dest);

    if let Err(e) = fs::copy(source, &partial) {
        discard(&partial);
        return Err(e);
    }
    if let Err(e) = fs::rename(&partial, dest) {
        discard(&partial);
        return Err(e);
    }
    if let Err(e) = fs::remove_file(source) {
        discard(dest);
        return Err(e);
    }
    Ok(())
}

/// `dir/name` becomes `dir/.name.partial`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".partial");
    dest.with_file_name(name)
}

/// Remove a file left by a failed move.
fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove incomplete copy"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchorus_core::Fingerprint;
    use tempfile::TempDir;

    fn record(path: &Path) -> FileRecord {
        FileRecord::new(path, Fingerprint::new([0; 32]), 0)
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn holding_with_source(content: &str) -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let holding = temp.path().join("holding");
        fs::create_dir(&holding).unwrap();
        let source = temp.path().join("a.txt");
        fs::write(&source, content).unwrap();
        (temp, holding, source)
    }

    #[test]
    fn test_copy_across_moves_file() {
        let (_temp, holding, source) = holding_with_source("payload");
        let dest = holding.join("a.txt");

        copy_across(&source, &dest).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "payload");
        assert_eq!(entries(&holding), vec!["a.txt"]);
    }

    #[test]
    fn test_copy_across_failed_copy_leaves_no_file() {
        let (temp, holding, _) = holding_with_source("payload");

        let missing = temp.path().join("ghost.txt");
        assert!(copy_across(&missing, &holding.join("ghost.txt")).is_err());
        assert!(entries(&holding).is_empty());

        let dir = temp.path().join("somedir");
        fs::create_dir(&dir).unwrap();
        assert!(copy_across(&dir, &holding.join("somedir")).is_err());
        assert!(entries(&holding).is_empty());
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_across_rolls_back_when_source_stays() {
        use std::os::unix::fs::PermissionsExt;

        let (temp, holding, _) = holding_with_source("payload");
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let source = locked.join("b.txt");
        fs::write(&source, "keep me").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users can still remove the source.
        if fs::write(locked.join("check"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = copy_across(&source, &holding.join("b.txt"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&source).unwrap(), "keep me");
        assert!(entries(&holding).is_empty());
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        assert_eq!(
            partial_path(Path::new("/h/photo (1).jpg")),
            PathBuf::from("/h/.photo (1).jpg.partial")
        );
    }

    #[test]
    fn test_prepare_creates_dir() {
        let temp = TempDir::new().unwrap();
        let holding = temp.path().join("nested/holding");

        Quarantine::new(&holding).prepare().unwrap();
        assert!(holding.is_dir());
    }

    #[test]
    fn test_prepare_rejects_file() {
        let temp = TempDir::new().unwrap();
        let holding = temp.path().join("holding");
        fs::write(&holding, "not a dir").unwrap();

        let err = Quarantine::new(&holding).prepare().unwrap_err();
        assert!(matches!(err, QuarantineError::NotADirectory { .. }));
    }

    #[test]
    fn test_missing_source_is_failure() {
        let temp = TempDir::new().unwrap();
        let quarantine = Quarantine::new(temp.path().join("holding"));
        quarantine.prepare().unwrap();

        let report = quarantine.relocate(&[record(&temp.path().join("ghost.txt"))]);
        assert_eq!(report.removed_count(), 0);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_report_summary_and_merge() {
        let mut a = RelocationReport::default();
        a.relocations.push(Relocation {
            from: "/a".into(),
            to: "/h/a".into(),
        });
        let mut b = RelocationReport::default();
        b.failures.push(RelocationFailure {
            path: "/b".into(),
            destination: "/h/b".into(),
            message: "nope".into(),
        });

        assert_eq!(a.summary(), "Quarantined 1 files");
        a.merge(b);
        assert_eq!(a.removed_count(), 1);
        assert_eq!(a.summary(), "Quarantined 1 files, 1 failed");
    }
}
