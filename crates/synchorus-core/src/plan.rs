//! Duplicate groups, cleanup plans and the aggregate removal result.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;
use crate::record::{FileRecord, Fingerprint};

/// A set of files sharing one fingerprint. Always has at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Fingerprint shared by every member.
    pub fingerprint: Fingerprint,

    /// Members in scan discovery order.
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Number of files in the group.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// How many files could go if one copy is kept.
    pub fn discardable_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Bytes reclaimable by keeping a single copy.
    pub fn wasted_bytes(&self) -> u64 {
        let size = self.members.first().map(|m| m.size).unwrap_or(0);
        size * self.discardable_count() as u64
    }
}

/// Which retention rule picked the kept file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetainReason {
    /// Exactly one member had a base filename without `(`.
    UniquePlainName,
    /// Several plain-named members; the lexicographically last path won.
    LexicographicTieBreak,
}

impl std::fmt::Display for RetainReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UniquePlainName => write!(f, "only plain-named copy"),
            Self::LexicographicTieBreak => write!(f, "last of several plain-named copies"),
        }
    }
}

/// Outcome of the retention heuristic for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retention {
    /// Keep `retain`, quarantine everything in `discard`.
    Retain {
        retain: FileRecord,
        discard: Vec<FileRecord>,
        reason: RetainReason,
    },
    /// No member qualifies for retention; the group is left untouched.
    Unresolved,
}

/// Retention decision for a single duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// The group the decision applies to.
    pub group: DuplicateGroup,
    /// What to keep and what to discard.
    pub decision: Retention,
}

impl CleanupPlan {
    /// Check whether a retention decision was made.
    pub fn is_resolved(&self) -> bool {
        matches!(self.decision, Retention::Retain { .. })
    }

    /// The file to keep, if resolved.
    pub fn retained(&self) -> Option<&FileRecord> {
        match &self.decision {
            Retention::Retain { retain, .. } => Some(retain),
            Retention::Unresolved => None,
        }
    }

    /// Files to quarantine; empty when unresolved.
    pub fn discards(&self) -> &[FileRecord] {
        match &self.decision {
            Retention::Retain { discard, .. } => discard,
            Retention::Unresolved => &[],
        }
    }
}

/// A file that was moved into the holding directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    /// Original location.
    pub from: PathBuf,
    /// Location inside the holding directory.
    pub to: PathBuf,
}

/// A file that could not be moved. The source is left where it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationFailure {
    /// Path that was to be moved.
    pub path: PathBuf,
    /// Intended destination.
    pub destination: PathBuf,
    /// Human-readable reason.
    pub message: String,
}

impl std::fmt::Display for RelocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of a full dedupe run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemovalResult {
    /// Number of files moved into the holding directory.
    pub removed_count: usize,

    /// Every member of every duplicate group, group by group.
    pub duplicate_members: Vec<FileRecord>,

    /// Duplicate groups found.
    pub groups: Vec<DuplicateGroup>,

    /// Fingerprints of groups the retention heuristic could not resolve.
    pub unresolved: Vec<Fingerprint>,

    /// Moves that succeeded.
    pub relocations: Vec<Relocation>,

    /// Moves that failed.
    pub failures: Vec<RelocationFailure>,

    /// Entries skipped during the scan.
    pub scan_warnings: Vec<ScanWarning>,

    /// Number of files read and hashed.
    pub files_scanned: usize,
}

impl RemovalResult {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Bytes reclaimable across all groups.
    pub fn total_wasted_bytes(&self) -> u64 {
        self.groups.iter().map(|g| g.wasted_bytes()).sum()
    }
}
