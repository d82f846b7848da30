//! Fingerprint-bucketed duplicate grouping.

use indexmap::IndexMap;
use tracing::debug;

use synchorus_core::{DuplicateGroup, FileRecord, Fingerprint};

/// Groups scan records into duplicate sets.
///
/// Records are bucketed by fingerprint in one pass, so grouping is linear in
/// the number of records. Buckets are kept in first-seen order and members
/// in the order the records were supplied, which makes results reproducible
/// for a sorted scan.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    buckets: IndexMap<Fingerprint, Vec<FileRecord>>,
}

impl DuplicateIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Records may arrive in any order.
    pub fn insert(&mut self, record: FileRecord) {
        self.buckets
            .entry(record.fingerprint)
            .or_default()
            .push(record);
    }

    /// Number of distinct fingerprints seen.
    pub fn distinct_count(&self) -> usize {
        self.buckets.len()
    }

    /// Consume the index and return every bucket with two or more members.
    pub fn into_groups(self) -> Vec<DuplicateGroup> {
        self.buckets
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(fingerprint, members)| DuplicateGroup {
                fingerprint,
                members,
            })
            .collect()
    }

    /// Group a full set of records.
    pub fn group(records: impl IntoIterator<Item = FileRecord>) -> Vec<DuplicateGroup> {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        let distinct = index.distinct_count();
        let groups = index.into_groups();
        debug!(
            distinct,
            groups = groups.len(),
            "grouped records by fingerprint"
        );
        groups
    }

    /// Every member of every group, group by group.
    pub fn flatten(groups: &[DuplicateGroup]) -> Vec<FileRecord> {
        groups
            .iter()
            .flat_map(|g| g.members.iter().cloned())
            .collect()
    }
}

impl Extend<FileRecord> for DuplicateIndex {
    fn extend<T: IntoIterator<Item = FileRecord>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}
