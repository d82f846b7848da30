//! Naming-based retention heuristic.
//!
//! A base filename containing `(` is treated as the signature of an
//! auto-renamed copy (`photo (1).jpg`, `report (copy).pdf`). The heuristic
//! keeps the canonically named file when exactly one exists, falls back to
//! the lexicographically last plain-named path when several do, and leaves
//! the group alone when every member is a parenthetical variant.

use std::cmp::Ordering;

use tracing::{debug, warn};

use synchorus_core::{CleanupPlan, DuplicateGroup, FileRecord, RetainReason, Retention};

/// Chooses which member of each duplicate group to keep.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionSelector;

impl RetentionSelector {
    /// Create a new selector.
    pub fn new() -> Self {
        Self
    }

    /// Decide what to keep for one group.
    pub fn select(&self, group: &DuplicateGroup) -> CleanupPlan {
        let decision = self.decide(&group.members);

        match &decision {
            Retention::Retain { retain, reason, discard } => {
                debug!(
                    fingerprint = %group.fingerprint.short(),
                    retain = %retain.path.display(),
                    discard = discard.len(),
                    %reason,
                    "retention resolved"
                );
            }
            Retention::Unresolved => {
                warn!(
                    fingerprint = %group.fingerprint,
                    members = group.count(),
                    "unable to determine which copy to retain, leaving group untouched"
                );
            }
        }

        CleanupPlan {
            group: group.clone(),
            decision,
        }
    }

    /// Decide for every group, in order.
    pub fn select_all(&self, groups: &[DuplicateGroup]) -> Vec<CleanupPlan> {
        groups.iter().map(|g| self.select(g)).collect()
    }

    fn decide(&self, members: &[FileRecord]) -> Retention {
        let plain: Vec<&FileRecord> = members.iter().filter(|m| !m.is_parenthesized()).collect();

        let (retain, reason) = match plain.len() {
            0 => return Retention::Unresolved,
            1 => (plain[0], RetainReason::UniquePlainName),
            _ => {
                let Some(last) = plain.iter().copied().max_by(|a, b| compare_paths(a, b)) else {
                    return Retention::Unresolved;
                };
                (last, RetainReason::LexicographicTieBreak)
            }
        };

        // Paths are unique within a scan, so comparing by path removes
        // exactly the retained member.
        let discard = members
            .iter()
            .filter(|m| m.path != retain.path)
            .cloned()
            .collect();

        Retention::Retain {
            retain: retain.clone(),
            discard,
            reason,
        }
    }
}

/// Byte-wise ordering of the full path strings.
fn compare_paths(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.path.as_os_str().cmp(b.path.as_os_str())
}
